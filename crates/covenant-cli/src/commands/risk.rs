use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use covenant_core::risk::{self, RiskInput};
use covenant_core::simulation::{self, CalculateRiskRequest};

use crate::input;

/// Arguments for EBITDA volatility risk scoring
#[derive(Args)]
pub struct CalculateRiskArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// EBITDA series, oldest first, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub ebitda_values: Vec<Decimal>,

    /// Current cash reserves
    #[arg(long)]
    pub cash_reserves: Option<Decimal>,

    /// Print the bare /calculate-risk response body instead of the envelope
    #[arg(long)]
    pub wire: bool,
}

pub fn run_calculate_risk(args: CalculateRiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input: RiskInput = if let Some(ref path) = args.input {
        input::file::read_file(path)?
    } else if !args.ebitda_values.is_empty() {
        RiskInput {
            ebitda_values: args.ebitda_values,
            cash_reserves: args.cash_reserves,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--ebitda-values is required (or provide --input)".into());
    };

    if args.wire {
        let request = CalculateRiskRequest {
            ebitda_values: risk_input.ebitda_values,
            cash_reserves: risk_input.cash_reserves,
        };
        let response = simulation::handle_calculate_risk(&request)?;
        return Ok(serde_json::to_value(response)?);
    }

    let result = risk::score_risk(&risk_input)?;
    Ok(serde_json::to_value(result)?)
}
