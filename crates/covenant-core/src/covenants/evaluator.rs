use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::CovenantError;
use crate::types::*;
use crate::CovenantResult;

/// Headroom below this fraction of the limit raises a warning.
const HEADROOM_WARNING_PCT: Decimal = dec!(0.10);

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantTestInput {
    pub financial: MonthlyFinancials,
    pub esg: EsgMetrics,
    #[serde(default)]
    pub covenants: CovenantConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantTestOutput {
    pub leverage_ratio: Multiple,
    pub max_leverage_ratio: Multiple,
    /// max - actual; negative once breached
    pub leverage_headroom: Multiple,
    pub financial_covenant_met: bool,
    pub carbon_emissions: Decimal,
    pub esg_target: Decimal,
    /// target - actual; negative once missed
    pub emissions_headroom: Decimal,
    pub esg_target_met: bool,
    pub all_passing: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Test the leverage covenant and the ESG emissions target for one period.
///
/// Both tests use strict `<`: a leverage ratio exactly at the ceiling is a
/// breach, and emissions exactly at the target count as a miss.
pub fn evaluate_covenants(
    input: &CovenantTestInput,
) -> CovenantResult<ComputationOutput<CovenantTestOutput>> {
    let start = Instant::now();

    input.financial.validate()?;
    input.esg.validate()?;
    input.covenants.validate()?;

    let output = assess(&input.financial, &input.esg, &input.covenants)?;
    let warnings = headroom_warnings(&output);

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "leverage_ratio": "debt / ebitda",
        "financial_covenant": "leverage_ratio < max_leverage_ratio",
        "esg_target": "carbon_emissions < esg_target",
    });

    Ok(with_metadata(
        "Sustainability-Linked Covenant Testing",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Debt / EBITDA. Zero EBITDA is rejected rather than reported as infinite.
pub fn leverage_ratio(debt: Money, ebitda: Money) -> CovenantResult<Multiple> {
    if ebitda.is_zero() {
        return Err(CovenantError::invalid(
            "financial.ebitda",
            "EBITDA is zero; leverage ratio is undefined.",
        ));
    }
    debt.checked_div(ebitda).ok_or_else(|| {
        CovenantError::invalid(
            "financial.debt",
            "Debt / EBITDA exceeds the representable decimal range.",
        )
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Covenant flags for already-validated inputs.
pub(crate) fn assess(
    financial: &MonthlyFinancials,
    esg: &EsgMetrics,
    covenants: &CovenantConfig,
) -> CovenantResult<CovenantTestOutput> {
    let leverage = leverage_ratio(financial.debt, financial.ebitda)?;
    let financial_covenant_met = leverage < covenants.max_leverage_ratio;
    let esg_target_met = esg.carbon_emissions < covenants.esg_target;

    debug!(
        %leverage,
        financial_covenant_met,
        carbon_emissions = %esg.carbon_emissions,
        esg_target_met,
        "covenants assessed"
    );

    Ok(CovenantTestOutput {
        leverage_ratio: leverage,
        max_leverage_ratio: covenants.max_leverage_ratio,
        leverage_headroom: covenants.max_leverage_ratio - leverage,
        financial_covenant_met,
        carbon_emissions: esg.carbon_emissions,
        esg_target: covenants.esg_target,
        emissions_headroom: covenants.esg_target - esg.carbon_emissions,
        esg_target_met,
        all_passing: financial_covenant_met && esg_target_met,
    })
}

pub(crate) fn headroom_warnings(output: &CovenantTestOutput) -> Vec<String> {
    let mut warnings = Vec::new();
    if output.financial_covenant_met
        && output.leverage_headroom < output.max_leverage_ratio * HEADROOM_WARNING_PCT
    {
        warnings.push(format!(
            "Leverage {:.2}x is within 10% of the {}x covenant ceiling.",
            output.leverage_ratio, output.max_leverage_ratio
        ));
    }
    if output.esg_target_met && output.emissions_headroom < output.esg_target * HEADROOM_WARNING_PCT
    {
        warnings.push(format!(
            "Emissions of {} t are within 10% of the {} t target.",
            output.carbon_emissions, output.esg_target
        ));
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
