use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::CovenantError;
use crate::types::*;
use crate::CovenantResult;

/// Decimal places of the published rate.
const RATE_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateInput {
    pub esg_target_met: bool,
    pub financial_covenant_met: bool,
    #[serde(default)]
    pub terms: LoanTerms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateStatus {
    Normal,
    EsgDiscountApplied,
    EsgPenaltyApplied,
    Breach,
}

impl RateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateStatus::Normal => "NORMAL",
            RateStatus::EsgDiscountApplied => "ESG_DISCOUNT_APPLIED",
            RateStatus::EsgPenaltyApplied => "ESG_PENALTY_APPLIED",
            RateStatus::Breach => "BREACH",
        }
    }

    /// Dashboard banner text for the status.
    pub fn message(&self) -> &'static str {
        match self {
            RateStatus::Normal => "Normal Operations",
            RateStatus::EsgDiscountApplied => "Rate Reduced: ESG Target Met",
            RateStatus::EsgPenaltyApplied => "Rate Increased: ESG Target Missed",
            RateStatus::Breach => "BREACH: Financial Covenant Violated",
        }
    }
}

/// Line items of the rate. Adjustments that were not applied are absent,
/// never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBreakdown {
    pub base_rate: Percent,
    pub base_margin: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustainability_discount: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustainability_penalty: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_risk_premium: Option<Percent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCalculationResult {
    pub final_rate: Percent,
    pub status: RateStatus,
    pub breakdown: RateBreakdown,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price one period of a sustainability-linked loan from its compliance flags.
pub fn calculate_rate(input: &RateInput) -> CovenantResult<ComputationOutput<RateCalculationResult>> {
    let start = Instant::now();

    let output = apply_ratchet(input.esg_target_met, input.financial_covenant_met, &input.terms)?;

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "sequence": [
            "base_rate + base_margin",
            "esg: - sustainability_discount if met, else + sustainability_penalty",
            "financial breach: + default_risk_premium, status BREACH",
        ],
        "rounding": "2 dp, half away from zero",
    });

    Ok(with_metadata(
        "Sustainability-Linked Margin Ratchet",
        &assumptions,
        Vec::new(),
        elapsed,
        output,
    ))
}

/// The ratchet rules, applied in fixed order.
///
/// The ESG branch always runs. A financial breach then adds the default risk
/// premium and overwrites the status with `BREACH`, leaving the ESG line item
/// in the breakdown.
pub fn apply_ratchet(
    esg_target_met: bool,
    financial_covenant_met: bool,
    terms: &LoanTerms,
) -> CovenantResult<RateCalculationResult> {
    terms.validate()?;
    let cfg = &terms.covenants;

    let mut rate = terms.all_in_base()?;
    let mut breakdown = RateBreakdown {
        base_rate: terms.base_rate,
        base_margin: terms.base_margin,
        sustainability_discount: None,
        sustainability_penalty: None,
        default_risk_premium: None,
    };

    let mut status = if esg_target_met {
        rate -= cfg.sustainability_discount;
        breakdown.sustainability_discount = Some(cfg.sustainability_discount);
        RateStatus::EsgDiscountApplied
    } else {
        rate = rate
            .checked_add(cfg.sustainability_penalty)
            .ok_or_else(|| rate_overflow("covenants.sustainability_penalty"))?;
        breakdown.sustainability_penalty = Some(cfg.sustainability_penalty);
        RateStatus::EsgPenaltyApplied
    };

    if !financial_covenant_met {
        rate = rate
            .checked_add(cfg.default_risk_premium)
            .ok_or_else(|| rate_overflow("covenants.default_risk_premium"))?;
        breakdown.default_risk_premium = Some(cfg.default_risk_premium);
        status = RateStatus::Breach;
    }

    let final_rate = round_half_away(rate, RATE_DP);
    debug!(%final_rate, status = status.as_str(), "rate ratchet applied");

    Ok(RateCalculationResult {
        final_rate,
        status,
        breakdown,
    })
}

fn rate_overflow(field: &str) -> CovenantError {
    CovenantError::invalid(field, "Adjusted rate exceeds the representable decimal range.")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
