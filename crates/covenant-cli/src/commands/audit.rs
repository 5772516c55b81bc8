use clap::Args;
use serde_json::Value;

use covenant_core::audit::{self, AuditRecord, AuditVerificationInput};

use crate::input;

/// Arguments for audit hash verification
#[derive(Args)]
pub struct VerifyAuditArgs {
    /// Path to JSON/YAML input: an audit record, or {record, audit_hash}
    #[arg(long)]
    pub input: Option<String>,

    /// Published hash to check the record against
    #[arg(long)]
    pub hash: Option<String>,
}

pub fn run_verify_audit(args: VerifyAuditArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data: Value = if let Some(ref path) = args.input {
        input::file::read_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for audit verification".into());
    };

    let verification = match args.hash {
        Some(hash) => {
            let record: AuditRecord = serde_json::from_value(input_data)?;
            AuditVerificationInput {
                record,
                audit_hash: hash,
            }
        }
        None => serde_json::from_value(input_data)
            .map_err(|e| format!("{e} (pass --hash when the input is a bare record)"))?,
    };

    let result = audit::verify_audit(&verification)?;
    Ok(serde_json::to_value(result)?)
}
