//! Client library and terminal dashboard for the persona benchmark service.
//!
//! Personas, scenarios and evaluation results come from the orchestration
//! API (or a JSON snapshot) and are folded into per-scenario and per-persona
//! summaries. An [`auth::AdminSession`] carries the admin key into every
//! request that needs it.

pub mod analytics;
pub mod api;
pub mod audit;
pub mod auth;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod format;
pub mod logging;
pub mod model;
pub mod render;
pub mod storage;
