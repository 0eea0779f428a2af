use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::audit::AUDIT_DISPLAY_LIMIT;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "personabench", version, about = "Persona benchmark dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Orchestration service origin (overrides PERSONABENCH_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,
    /// SQLite file holding the saved admin key
    #[arg(long, global = true, value_name = "FILE")]
    pub credential_db: Option<String>,
    /// Use this admin key for one run without saving it (ignored by login
    /// and logout, which always act on the saved key)
    #[arg(long, global = true, value_name = "KEY")]
    pub admin_key: Option<String>,
    /// Read personas, scenarios, results and audit events from a JSON file
    /// instead of the service
    #[arg(long, global = true, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Overview plus per-scenario and per-persona score summaries
    Analytics,
    /// List personas
    Personas,
    /// Show a scenario's raw definition
    Scenario { id: String },
    /// Summarize the audit log and list the newest events
    Audit {
        #[arg(long, default_value_t = AUDIT_DISPLAY_LIMIT)]
        limit: usize,
    },
    /// Save an admin key for later runs
    Login { key: String },
    /// Forget the saved admin key
    Logout,
    /// Report whether an admin key is held
    Whoami,
    /// Upload a persona definition, filed under its `name` (admin)
    SavePersona {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// List comparison pairs awaiting review (admin)
    Pairs {
        #[arg(long)]
        limit: Option<usize>,
        /// Include pairs that already have votes
        #[arg(long)]
        all: bool,
    },
    /// Show one comparison pair, blinded (admin)
    Pair { id: String },
    /// Record a preference between slots A and B (admin)
    Vote {
        pair_id: String,
        slot: String,
        #[arg(long)]
        reviewer: Option<String>,
        #[arg(long)]
        rationale: Option<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Show server-computed rankings from recorded votes (admin)
    Rankings {
        #[arg(long)]
        target: Option<String>,
    },
}

impl Cli {
    /// Run-only admin key, if any. `login` and `logout` manage the saved
    /// credential, so they never take it.
    pub fn session_override(&self) -> Option<&str> {
        match self.command {
            Commands::Login { .. } | Commands::Logout => None,
            _ => self.admin_key.as_deref(),
        }
    }

    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(base) = &self.api_base {
            cfg.api_base = base.clone();
        }
        if let Some(db) = &self.credential_db {
            cfg.credential_db = db.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vote() {
        let cli = Cli::parse_from([
            "personabench", "vote", "pair-1", "b", "--confidence", "0.8", "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Vote { pair_id, slot, confidence, .. } => {
                assert_eq!(pair_id, "pair-1");
                assert_eq!(slot, "b");
                assert_eq!(confidence, Some(0.8));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["personabench", "--api-base", "http://x.test", "whoami"]);
        let mut cfg = Config::default();
        cli.apply_overrides(&mut cfg);
        assert_eq!(cfg.api_base, "http://x.test");
        assert_eq!(cfg.credential_db, crate::config::DEFAULT_CREDENTIAL_DB);
    }

    #[test]
    fn test_admin_key_override_skips_credential_commands() {
        let cli = Cli::parse_from(["personabench", "--admin-key", "run-only", "pairs"]);
        assert_eq!(cli.session_override(), Some("run-only"));

        let cli = Cli::parse_from([
            "personabench", "--admin-key", "run-only", "login", "kept",
        ]);
        assert_eq!(cli.session_override(), None);

        let cli = Cli::parse_from(["personabench", "--admin-key", "run-only", "logout"]);
        assert_eq!(cli.session_override(), None);
    }

    #[test]
    fn test_save_persona_takes_only_a_file() {
        let cli = Cli::parse_from(["personabench", "save-persona", "--file", "p.json"]);
        match &cli.command {
            Commands::SavePersona { file } => assert!(file.ends_with("p.json")),
            other => panic!("unexpected command {:?}", other),
        }
        let with_id =
            Cli::try_parse_from(["personabench", "save-persona", "x", "--file", "p.json"]);
        assert!(with_id.is_err());
    }

    #[test]
    fn test_audit_default_limit() {
        let cli = Cli::parse_from(["personabench", "audit"]);
        assert!(matches!(cli.command, Commands::Audit { limit: 20 }));
    }
}
