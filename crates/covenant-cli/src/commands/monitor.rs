use clap::Args;
use serde_json::{json, Value};
use std::sync::Arc;

use covenant_core::service::{CovenantMonitor, InMemoryAuditLog, NotificationOutbox, Unlimited};
use covenant_core::simulation::CalculateRateRequest;

use crate::config;
use crate::input;

/// Arguments for evaluating a booked loan's monthly submission
#[derive(Args)]
pub struct MonitorArgs {
    /// Loan book file: a JSON/YAML list of loan records
    #[arg(long)]
    pub loans: String,

    /// Loan to evaluate
    #[arg(long)]
    pub loan_id: String,

    /// Client key the request is attributed to
    #[arg(long, default_value = "cli")]
    pub client: String,

    /// Path to JSON/YAML submission (financial, esg, month, ebitda_history)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_monitor(args: MonitorArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CalculateRateRequest = if let Some(ref path) = args.input {
        input::file::read_file(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for loan monitoring".into());
    };

    let book = config::load_loan_book(&args.loans)?;
    let audit_log = Arc::new(InMemoryAuditLog::new());
    let outbox = Arc::new(NotificationOutbox::new());
    let monitor = CovenantMonitor::new(
        Arc::new(book),
        audit_log.clone(),
        outbox.clone(),
        Arc::new(Unlimited),
    );

    let result = monitor.evaluate(&args.client, &args.loan_id, &request)?;

    Ok(json!({
        "result": result,
        "audit_trail": audit_log.entries(),
        "notices": outbox.drain(),
    }))
}
