use clap::Args;
use serde_json::Value;

use covenant_core::pricing::{self, RateInput};
use covenant_core::simulation::{self, CalculateRateRequest};

use crate::config;
use crate::input;

/// Arguments for a full monthly simulation
#[derive(Args)]
pub struct CalculateRateArgs {
    /// Path to JSON/YAML request body (financial, esg, month, ebitda_history)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan terms file (defaults to $COVENANT_TERMS, then built-in terms)
    #[arg(long)]
    pub terms: Option<String>,

    /// Loan book file; with --loan-id, supplies terms and stored EBITDA history
    #[arg(long, requires = "loan_id")]
    pub loans: Option<String>,

    /// Booked loan to price against
    #[arg(long, requires = "loans")]
    pub loan_id: Option<String>,

    /// Print the bare /calculate-rate response body instead of the envelope
    #[arg(long)]
    pub wire: bool,
}

/// Arguments for the margin ratchet on its own
#[derive(Args)]
pub struct RateArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// The ESG emissions target was met this period
    #[arg(long)]
    pub esg_target_met: bool,

    /// The leverage covenant was met this period
    #[arg(long)]
    pub financial_covenant_met: bool,

    /// Loan terms file (defaults to $COVENANT_TERMS, then built-in terms)
    #[arg(long)]
    pub terms: Option<String>,
}

pub fn run_calculate_rate(args: CalculateRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CalculateRateRequest = if let Some(ref path) = args.input {
        input::file::read_file(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for rate calculation".into());
    };
    let loan = config::load_loan_context(
        args.terms.as_deref(),
        args.loans.as_deref(),
        args.loan_id.as_deref(),
    )?;

    if args.wire {
        let response = simulation::handle_calculate_rate(&request, &loan)?;
        return Ok(serde_json::to_value(response)?);
    }

    let result = simulation::simulate(&loan.simulation_input(&request)?)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate_input: RateInput = if let Some(ref path) = args.input {
        input::file::read_file(path)?
    } else {
        RateInput {
            esg_target_met: args.esg_target_met,
            financial_covenant_met: args.financial_covenant_met,
            terms: config::load_terms(args.terms.as_deref())?,
        }
    };
    let result = pricing::calculate_rate(&rate_input)?;
    Ok(serde_json::to_value(result)?)
}
