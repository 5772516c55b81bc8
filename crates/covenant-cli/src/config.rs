//! Loan terms and loan book resolution.

use std::env;
use tracing::debug;

use covenant_core::service::{InMemoryLoanBook, LoanRecord, LoanTermsSource};
use covenant_core::simulation::LoanContext;
use covenant_core::LoanTerms;

use crate::input;

/// Environment variable naming a terms file, consulted when `--terms` is absent.
pub const TERMS_ENV: &str = "COVENANT_TERMS";

/// `--terms`, then `$COVENANT_TERMS`, then the built-in defaults.
pub fn load_terms(path: Option<&str>) -> Result<LoanTerms, Box<dyn std::error::Error>> {
    let from_env = env::var(TERMS_ENV).ok().filter(|p| !p.trim().is_empty());
    let source = path.map(str::to_string).or(from_env);

    let terms = match source {
        Some(p) => {
            let terms: LoanTerms = input::file::read_file(&p)?;
            debug!(path = %p, "loan terms loaded");
            terms
        }
        None => LoanTerms::default(),
    };
    terms.validate()?;
    Ok(terms)
}

/// A JSON or YAML list of loan records.
pub fn load_loan_book(path: &str) -> Result<InMemoryLoanBook, Box<dyn std::error::Error>> {
    let records: Vec<LoanRecord> = input::file::read_file(path)?;
    for record in &records {
        record.terms.validate()?;
    }
    debug!(path, loans = records.len(), "loan book loaded");
    Ok(InMemoryLoanBook::new(records))
}

/// What is on file for a one-off submission: a booked loan's terms and
/// stored EBITDA when `--loans` and `--loan-id` are given, otherwise the
/// resolved terms with no history.
pub fn load_loan_context(
    terms: Option<&str>,
    loans: Option<&str>,
    loan_id: Option<&str>,
) -> Result<LoanContext, Box<dyn std::error::Error>> {
    match (loans, loan_id) {
        (Some(path), Some(id)) => {
            let book = load_loan_book(path)?;
            Ok(LoanContext::from(book.loan(id)?))
        }
        (None, None) => Ok(LoanContext {
            terms: load_terms(terms)?,
            ebitda_history: Vec::new(),
        }),
        _ => Err("--loans and --loan-id must be given together".into()),
    }
}
