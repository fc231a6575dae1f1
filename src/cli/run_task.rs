//! Handler for the `run` command: drives a single task, loaded from a JSON
//! file, to completion using the bundled adapters. Local operator tooling
//! and smoke-testing only; the chat transport is out of scope.

use std::path::Path;

use async_trait::async_trait;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{OzonHttpClient, SqliteTaskStore, TracingEventBus};
use crate::cli::output;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::domain::Task;
use crate::engine::{RateLimiter, SupplyOrchestrator};
use crate::error::{Error, Result};
use crate::ports::{CredentialStore, Credentials};

/// Resolves every user to the same pair of credentials, read from
/// `OZON_CLIENT_ID`/`OZON_API_KEY`. Adequate for an operator running one
/// task at a time; a real deployment supplies its own `CredentialStore`.
struct EnvCredentialStore;

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn credentials_for(&self, _user_id: &str) -> Result<Option<Credentials>> {
        let client_id = match std::env::var("OZON_CLIENT_ID") {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        let api_key = match std::env::var("OZON_API_KEY") {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        Ok(Some(Credentials { client_id, api_key }))
    }

    async fn clear(&self, _user_id: &str) -> Result<()> {
        Ok(())
    }
}

pub async fn execute(config_path: &Path, task_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;
    config.init_logging();

    output::section("Ozon Slot Engine");
    output::field("Task file", task_path.display());
    output::field("Database", &config.database_url);

    let raw = std::fs::read_to_string(task_path)?;
    let task: Task = serde_json::from_str(&raw)?;
    task.validate(chrono::Utc::now(), config.supply.ready_days_max)?;

    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    let client = OzonHttpClient::new(config.http.base_url.clone(), config.http.clone())?;
    let store = SqliteTaskStore::new(pool);
    let credentials = EnvCredentialStore;
    let events = TracingEventBus;
    let rate_limiter = RateLimiter::new(config.rate_limit.clone());

    let orchestrator = SupplyOrchestrator {
        client: &client,
        store: &store,
        credentials: &credentials,
        events: &events,
        rate_limiter: &rate_limiter,
        draft_config: &config.draft,
        timeslot_config: &config.timeslot,
        supply_config: &config.supply,
    };

    let cancel = CancellationToken::new();
    let run_future = orchestrator.run(task, cancel.clone());
    tokio::pin!(run_future);

    let result = tokio::select! {
        result = &mut run_future => result,
        _ = signal::ctrl_c() => {
            info!("interrupt received, cancelling task");
            cancel.cancel();
            run_future.await
        }
    };

    match result {
        Ok(()) => {
            output::success("task finished");
            Ok(())
        }
        Err(e) => {
            output::error(&describe(&e));
            Err(e)
        }
    }
}

/// Surfaces a `CredentialRevoked` as a clear operator-facing message rather
/// than a raw error chain.
fn describe(err: &Error) -> String {
    match err {
        Error::CredentialRevoked(reason) => format!("credential revoked: {reason}"),
        other => other.to_string(),
    }
}
