use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use covenant_core::simulation::LoanContext;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn to_json(value: &impl Serialize) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

/// `{ terms, ebitda_history }` on file for the loan; default terms and no
/// stored history when absent.
fn parse_loan(loan_json: Option<String>) -> NapiResult<LoanContext> {
    match loan_json {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).map_err(to_napi_error)
        }
        _ => Ok(LoanContext::default()),
    }
}

// ---------------------------------------------------------------------------
// HTTP-shaped operations
// ---------------------------------------------------------------------------

/// `POST /calculate-rate` body in, response body out. Without history in the
/// body, the loan's stored `ebitda_history` is scored.
#[napi]
pub fn calculate_rate(request_json: String, loan_json: Option<String>) -> NapiResult<String> {
    let request: covenant_core::simulation::CalculateRateRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let loan = parse_loan(loan_json)?;
    let response = covenant_core::simulation::handle_calculate_rate(&request, &loan)
        .map_err(to_napi_error)?;
    to_json(&response)
}

/// `POST /calculate-risk` body in, response body out.
#[napi]
pub fn calculate_risk(request_json: String) -> NapiResult<String> {
    let request: covenant_core::simulation::CalculateRiskRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let response =
        covenant_core::simulation::handle_calculate_risk(&request).map_err(to_napi_error)?;
    to_json(&response)
}

// ---------------------------------------------------------------------------
// Engine envelopes
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate(input_json: String) -> NapiResult<String> {
    let input: covenant_core::simulation::SimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenant_core::simulation::simulate(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn rate_from_flags(input_json: String) -> NapiResult<String> {
    let input: covenant_core::pricing::RateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenant_core::pricing::calculate_rate(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn evaluate_covenants(input_json: String) -> NapiResult<String> {
    let input: covenant_core::covenants::CovenantTestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenant_core::covenants::evaluate_covenants(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn verify_audit_hash(input_json: String) -> NapiResult<String> {
    let input: covenant_core::audit::AuditVerificationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenant_core::audit::verify_audit(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Analyst
// ---------------------------------------------------------------------------

#[napi]
pub fn analyst_answer(question: String, context_json: Option<String>) -> NapiResult<String> {
    let ctx: covenant_core::analyst::AnalystContext = match context_json {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).map_err(to_napi_error)?
        }
        _ => Default::default(),
    };
    let answer = covenant_core::analyst::answer(&question, &ctx);
    to_json(&serde_json::json!({ "question": question, "answer": answer }))
}
