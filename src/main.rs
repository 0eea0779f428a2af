use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;

use personabench_dashboard::analytics::{analyze_personas, analyze_scenarios, summarize};
use personabench_dashboard::api::retry::{retry_async, RetryConfig};
use personabench_dashboard::api::{ApiClient, HttpTransport};
use personabench_dashboard::audit::{recent_events, summarize_audit};
use personabench_dashboard::auth::AdminSession;
use personabench_dashboard::cli::{Cli, Commands};
use personabench_dashboard::comparison::{blind_view, pending_pairs, Slot, VoteSubmission};
use personabench_dashboard::config::Config;
use personabench_dashboard::logging::{self, obj, v_str, Domain, Level};
use personabench_dashboard::model::Snapshot;
use personabench_dashboard::render;
use personabench_dashboard::storage::SqliteCredentialStore;

type Client = ApiClient<HttpTransport>;

fn emit<T: Serialize>(as_json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

/// A missing or unreadable credential file is not fatal: the session just
/// runs without persistence.
fn open_session(cli: &Cli, cfg: &Config) -> AdminSession {
    if let Some(key) = cli.session_override() {
        let mut session = AdminSession::in_memory();
        session.initialize();
        session.set_admin_key(key);
        return session;
    }
    let mut session = if cfg.credential_db.is_empty() {
        AdminSession::in_memory()
    } else {
        match SqliteCredentialStore::open(&cfg.credential_db) {
            Ok(store) => AdminSession::new(Box::new(store)),
            Err(err) => {
                logging::warn(
                    Domain::Auth,
                    "credential_store_unavailable",
                    obj(&[
                        ("path", v_str(&cfg.credential_db)),
                        ("error", v_str(&err.to_string())),
                    ]),
                );
                AdminSession::in_memory()
            }
        }
    };
    session.initialize();
    session
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Snapshot::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn load_snapshot(
    cli: &Cli,
    client: &Client,
    session: &AdminSession,
    retry: &RetryConfig,
) -> Result<Snapshot> {
    match &cli.snapshot {
        Some(path) => read_snapshot(path),
        None => Ok(retry_async(retry, "load_snapshot", || client.load_snapshot(session)).await?),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        logging::log(
            Level::Error,
            Domain::System,
            "fatal",
            obj(&[("error", v_str(&format!("{:#}", e)))]),
        );
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    if let Some(raw) = &cli.log_level {
        let level = Level::parse(raw).ok_or_else(|| anyhow!("unknown log level {:?}", raw))?;
        logging::set_min_level(level);
    }

    let mut cfg = Config::from_env();
    cli.apply_overrides(&mut cfg);
    logging::debug(
        Domain::System,
        "startup",
        obj(&[
            ("api_base", v_str(&cfg.api_base)),
            ("api_prefix", v_str(&cfg.normalized_prefix())),
        ]),
    );

    let mut session = open_session(&cli, &cfg);
    let client = ApiClient::new(HttpTransport::new(&cfg)?, &cfg.normalized_prefix());
    let retry = RetryConfig::with_retries(cfg.max_retries);

    match &cli.command {
        Commands::Analytics => {
            let snap = load_snapshot(&cli, &client, &session, &retry).await?;
            let summary = summarize(&snap.personas, &snap.scenarios, &snap.results);
            let scenarios = analyze_scenarios(&snap.personas, &snap.scenarios, &snap.results);
            let personas = analyze_personas(&snap.personas, &snap.scenarios, &snap.results);
            let payload = json!({
                "summary": summary,
                "scenarios": scenarios,
                "personas": personas,
            });
            emit(cli.json, &payload, || {
                format!(
                    "{}\n{}\n{}",
                    render::summary(&summary),
                    render::scenario_table(&scenarios),
                    render::persona_table(&personas)
                )
            })?;
        }
        Commands::Personas => {
            let personas = match &cli.snapshot {
                Some(path) => read_snapshot(path)?.personas,
                None => {
                    retry_async(&retry, "list_personas", || client.list_personas(&session)).await?
                }
            };
            emit(cli.json, &personas, || render::persona_list(&personas))?;
        }
        Commands::Scenario { id } => {
            let scenarios = match &cli.snapshot {
                Some(path) => read_snapshot(path)?.scenarios,
                None => {
                    retry_async(&retry, "list_scenarios", || client.list_scenarios(&session))
                        .await?
                }
            };
            let scenario = scenarios
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| anyhow!("scenario {:?} not found", id))?;
            emit(cli.json, scenario, || render::scenario_source(scenario))?;
        }
        Commands::Audit { limit } => {
            let events = match &cli.snapshot {
                Some(path) => read_snapshot(path)?.audit,
                None => {
                    retry_async(&retry, "list_audit_events", || {
                        client.list_audit_events(&session, None)
                    })
                    .await?
                }
            };
            let summary = summarize_audit(&events);
            let recent = recent_events(&events, *limit);
            let payload = json!({ "summary": summary, "recent": recent });
            emit(cli.json, &payload, || render::audit_panel(&summary, &events, *limit))?;
        }
        Commands::Login { key } => {
            session.set_admin_key(key);
            if !session.has_admin_access() {
                bail!("admin key is empty");
            }
            println!("admin key saved (fingerprint {})", session.fingerprint());
        }
        Commands::Logout => {
            session.clear_admin_key();
            println!("admin key cleared");
        }
        Commands::Whoami => {
            let payload = json!({
                "hasAdminAccess": session.has_admin_access(),
                "fingerprint": session.fingerprint(),
            });
            emit(cli.json, &payload, || {
                if session.has_admin_access() {
                    format!("admin access (fingerprint {})\n", session.fingerprint())
                } else {
                    "no admin key\n".to_string()
                }
            })?;
        }
        Commands::SavePersona { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let definition: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            let saved = client.save_persona(&session, definition).await?;
            emit(cli.json, &saved, || {
                let name = saved.get("name").and_then(|n| n.as_str()).unwrap_or("persona");
                format!("saved {}\n", name)
            })?;
        }
        Commands::Pairs { limit, all } => {
            let pairs =
                retry_async(&retry, "list_pairs", || client.list_pairs(&session, *limit)).await?;
            let shown: Vec<_> = if *all {
                pairs.iter().map(blind_view).collect()
            } else {
                pending_pairs(&pairs).into_iter().map(blind_view).collect()
            };
            emit(cli.json, &shown, || render::pair_list(&shown))?;
        }
        Commands::Pair { id } => {
            let pair = retry_async(&retry, "get_pair", || client.get_pair(&session, id)).await?;
            let pair = blind_view(&pair);
            emit(cli.json, &pair, || render::comparison_pair(&pair))?;
        }
        Commands::Vote {
            pair_id,
            slot,
            reviewer,
            rationale,
            confidence,
        } => {
            let slot = Slot::parse(slot)?;
            let pair =
                retry_async(&retry, "get_pair", || client.get_pair(&session, pair_id)).await?;
            let mut vote = VoteSubmission::new(slot);
            vote.reviewer = reviewer.clone();
            vote.rationale = rationale.clone();
            vote.confidence = *confidence;
            let recorded = client.submit_vote(&session, &pair, vote).await?;
            emit(cli.json, &recorded, || {
                format!("recorded vote {} for slot {}\n", recorded.id, recorded.winner_slot)
            })?;
        }
        Commands::Rankings { target } => {
            let agg = retry_async(&retry, "fetch_aggregate", || {
                client.fetch_aggregate(&session, target.as_deref())
            })
            .await?;
            emit(cli.json, &agg, || render::rankings(&agg))?;
        }
    }
    Ok(())
}
