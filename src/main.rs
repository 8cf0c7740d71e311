//! Commithooks demo: runs a committed and a failed transaction against the
//! in-memory engine and logs every hook as it fires.

use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt};

use commithooks_core::config::AppConfig;
use commithooks_core::config::logging::LogFormat;
use commithooks_core::error::AppError;
use commithooks_core::result::AppResult;
use commithooks_core::traits::{CommitHooks, Model};
use commithooks_session::{HookSession, MemoryEngine};

fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config) {
        tracing::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    if let Ok(path) = std::env::var("COMMITHOOKS_CONFIG") {
        return AppConfig::from_file(&path)
            .map_err(|e| AppError::internal(format!("Config load error: {}", e)));
    }

    let env = std::env::var("COMMITHOOKS_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env).map_err(|e| AppError::internal(format!("Config load error: {}", e)))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// An invoice that stamps a number before insert and reports its outcome.
#[derive(Debug, Serialize)]
struct Invoice {
    id: u32,
    customer: String,
    total_cents: i64,
    number: Option<String>,
}

impl Invoice {
    fn new(id: u32, customer: &str, total_cents: i64) -> Self {
        Self {
            id,
            customer: customer.to_string(),
            total_cents,
            number: None,
        }
    }
}

impl CommitHooks for Invoice {
    fn before_commit_from_insert(&mut self) -> AppResult<()> {
        let number = format!("INV-{:05}", self.id);
        tracing::info!(invoice = self.id, number = %number, "before insert: assigning number");
        self.number = Some(number);
        Ok(())
    }

    fn after_commit_from_insert(&mut self) -> AppResult<()> {
        tracing::info!(invoice = self.id, customer = %self.customer, "after insert: invoice issued");
        Ok(())
    }

    fn failed_commit_from_insert(&mut self) -> AppResult<()> {
        tracing::warn!(invoice = self.id, "failed insert: invoice was not issued");
        Ok(())
    }

    fn before_commit_from_update(&mut self) -> AppResult<()> {
        tracing::info!(invoice = self.id, total_cents = self.total_cents, "before update");
        Ok(())
    }

    fn failed_commit_from_update(&mut self) -> AppResult<()> {
        tracing::warn!(invoice = self.id, "failed update: change was discarded");
        Ok(())
    }

    fn after_commit_from_delete(&mut self) -> AppResult<()> {
        tracing::info!(invoice = self.id, "after delete: invoice voided");
        Ok(())
    }
}

impl Model for Invoice {
    fn table(&self) -> &'static str {
        "invoices"
    }

    fn primary_key(&self) -> String {
        self.id.to_string()
    }

    fn to_row(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Runs the scripted transactions
fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting commithooks demo v{}", env!("CARGO_PKG_VERSION"));

    let mut session = HookSession::with_config(MemoryEngine::new(), config.hooks);

    // ── Transaction 1: two inserts that commit ───────────────────
    let first = session.add(Invoice::new(1, "acme", 12_500));
    let second = session.add(Invoice::new(2, "globex", 4_200));
    if let Some(report) = session.commit()? {
        tracing::info!(
            outcome = %report.outcome,
            invoked = report.invoked,
            rows = session.engine().row_count("invoices"),
            "Transaction 1 done"
        );
    }

    // ── Transaction 2: an update whose commit fails ──────────────
    if let Some(invoice) = session.get_mut::<Invoice>(first) {
        invoice.total_cents += 1_000;
    }
    session.flush()?;
    session.engine_mut().fail_next_commit("simulated storage outage");
    match session.commit() {
        Ok(_) => tracing::warn!("Transaction 2 unexpectedly committed"),
        Err(e) => tracing::info!(error = %e, "Transaction 2 failed as scripted"),
    }

    // ── Transaction 3: void the second invoice ───────────────────
    session.delete(second)?;
    session.commit()?;

    tracing::info!(
        rows = session.engine().row_count("invoices"),
        commits = session.engine().commit_count(),
        "Demo complete"
    );
    Ok(())
}
