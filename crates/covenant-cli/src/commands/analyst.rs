use clap::Args;
use serde_json::{json, Value};

use covenant_core::analyst::{self, AnalystContext};
use covenant_core::simulation::{self, CalculateRateRequest};

use crate::config;
use crate::input;

/// Arguments for the loan analyst
#[derive(Args)]
pub struct AskArgs {
    /// The question, e.g. "How do I lower my rate?"
    pub question: String,

    /// Optional submission to simulate first, so answers use live figures
    #[arg(long)]
    pub input: Option<String>,

    /// Loan terms file (defaults to $COVENANT_TERMS, then built-in terms)
    #[arg(long)]
    pub terms: Option<String>,

    /// Loan book file; with --loan-id, supplies terms and stored EBITDA history
    #[arg(long, requires = "loan_id")]
    pub loans: Option<String>,

    /// Booked loan the question is about
    #[arg(long, requires = "loans")]
    pub loan_id: Option<String>,
}

pub fn run_ask(args: AskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = config::load_loan_context(
        args.terms.as_deref(),
        args.loans.as_deref(),
        args.loan_id.as_deref(),
    )?;

    let result = match args.input {
        Some(ref path) => {
            let request: CalculateRateRequest = input::file::read_file(path)?;
            Some(simulation::run_simulation(&loan.simulation_input(&request)?)?)
        }
        None => None,
    };

    let ctx = AnalystContext {
        terms: loan.terms,
        result,
    };
    let answer = analyst::answer(&args.question, &ctx);

    Ok(json!({
        "result": {
            "question": args.question,
            "answer": answer,
        }
    }))
}
