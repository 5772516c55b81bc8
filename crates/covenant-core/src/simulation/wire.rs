//! Request and response bodies of `POST /calculate-rate` and
//! `POST /calculate-risk`.
//!
//! Responses carry plain JSON numbers, so every decimal is serialized through
//! `rust_decimal::serde::float`. Requests accept numbers or numeric strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::engine::{run_simulation, SimulationInput, SimulationResult};
use crate::error::CovenantError;
use crate::risk::scorer::assess_risk;
use crate::types::*;
use crate::CovenantResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRateRequest {
    pub financial: MonthlyFinancials,
    pub esg: EsgMetrics,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub ebitda_history: Vec<Money>,
}

/// What is already on file for a loan when a submission arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanContext {
    #[serde(default)]
    pub terms: LoanTerms,
    /// Stored EBITDA, oldest first
    #[serde(default)]
    pub ebitda_history: Vec<Money>,
}

impl LoanContext {
    /// Simulation input for one submission against this loan.
    ///
    /// The request's history wins; the stored history is used when the
    /// request carries none. With neither there is nothing to score default
    /// risk from, so the submission is rejected.
    pub fn simulation_input(
        &self,
        request: &CalculateRateRequest,
    ) -> CovenantResult<SimulationInput> {
        let ebitda_history = if request.ebitda_history.is_empty() {
            self.ebitda_history.clone()
        } else {
            request.ebitda_history.clone()
        };
        if ebitda_history.is_empty() {
            return Err(CovenantError::invalid(
                "ebitda_history",
                "No EBITDA history in the request or on file; default risk cannot be scored.",
            ));
        }
        Ok(SimulationInput {
            financial: request.financial.clone(),
            esg: request.esg.clone(),
            month: request.month.clone(),
            ebitda_history,
            terms: self.terms.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub base_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volatility: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub probability_of_default: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateRateResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub new_interest_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,
    pub is_compliant: bool,
    pub audit_hash: String,
    pub message: String,
    pub breakdown: WireBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRiskRequest {
    pub ebitda_values: Vec<Money>,
    #[serde(default)]
    pub cash_reserves: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateRiskResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volatility: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub probability_of_default: Decimal,
    pub message: String,
}

impl From<&SimulationResult> for CalculateRateResponse {
    fn from(r: &SimulationResult) -> Self {
        Self {
            new_interest_rate: r.new_interest_rate,
            risk_score: r.risk_score,
            is_compliant: r.is_compliant,
            audit_hash: r.audit_hash.clone(),
            message: r.message.clone(),
            breakdown: WireBreakdown {
                base_rate: r.breakdown.base_rate,
                margin: r.breakdown.margin,
                risk_score: r.breakdown.risk_score,
                volatility: r.breakdown.volatility,
                probability_of_default: r.breakdown.probability_of_default,
            },
        }
    }
}

/// `POST /calculate-rate` against the loan's terms and stored EBITDA.
pub fn handle_calculate_rate(
    request: &CalculateRateRequest,
    loan: &LoanContext,
) -> CovenantResult<CalculateRateResponse> {
    let input = loan.simulation_input(request)?;
    let result = run_simulation(&input)?;
    Ok(CalculateRateResponse::from(&result))
}

/// `POST /calculate-risk`.
pub fn handle_calculate_risk(request: &CalculateRiskRequest) -> CovenantResult<CalculateRiskResponse> {
    let risk = assess_risk(&request.ebitda_values, request.cash_reserves)?;
    Ok(CalculateRiskResponse {
        risk_score: risk.risk_score,
        volatility: risk.volatility,
        probability_of_default: risk.probability_of_default,
        message: risk.message,
    })
}
