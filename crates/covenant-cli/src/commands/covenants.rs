use clap::Args;
use serde_json::Value;

use covenant_core::covenants::{self, CovenantTestInput};

use crate::config;
use crate::input;

/// Arguments for covenant compliance testing
#[derive(Args)]
pub struct CovenantTestArgs {
    /// Path to JSON/YAML input file (financial, esg, optional covenants)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan terms file supplying the covenants when the input has none
    #[arg(long)]
    pub terms: Option<String>,
}

pub fn run_covenant_test(args: CovenantTestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data: Value = if let Some(ref path) = args.input {
        input::file::read_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for covenant testing".into());
    };

    // Covenants embedded in the input win over the terms file.
    let has_covenants = input_data.get("covenants").is_some_and(|c| !c.is_null());
    let mut test_input: CovenantTestInput = serde_json::from_value(input_data)?;
    if !has_covenants {
        test_input.covenants = config::load_terms(args.terms.as_deref())?.covenants;
    }

    let result = covenants::evaluate_covenants(&test_input)?;
    Ok(serde_json::to_value(result)?)
}
