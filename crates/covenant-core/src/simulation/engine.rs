use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::audit::{audit_hash, AuditRecord};
use crate::covenants::evaluator::{assess, headroom_warnings};
use crate::covenants::CovenantTestOutput;
use crate::pricing::{apply_ratchet, RateBreakdown, RateStatus};
use crate::risk::scorer::{assess_risk, risk_warnings};
use crate::risk::RiskTier;
use crate::types::*;
use crate::CovenantResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub financial: MonthlyFinancials,
    pub esg: EsgMetrics,
    /// Period label. Carried through, never computed on.
    #[serde(default)]
    pub month: String,
    /// Prior periods, oldest first, excluding the current one
    #[serde(default)]
    pub ebitda_history: Vec<Money>,
    #[serde(default)]
    pub terms: LoanTerms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationBreakdown {
    pub base_rate: Percent,
    pub margin: Percent,
    pub risk_score: Decimal,
    pub volatility: Decimal,
    pub probability_of_default: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub new_interest_rate: Percent,
    pub risk_score: Decimal,
    pub is_compliant: bool,
    pub audit_hash: String,
    pub message: String,
    pub status: RateStatus,
    pub risk_tier: RiskTier,
    pub breakdown: SimulationBreakdown,
    pub rate_breakdown: RateBreakdown,
    pub covenants: CovenantTestOutput,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price, score and hash one reporting period. Either the full result or an
/// error; nothing is returned half-computed.
pub fn run_simulation(input: &SimulationInput) -> CovenantResult<SimulationResult> {
    run_period(input).map(|(result, _)| result)
}

/// `run_simulation` in the standard envelope, with covenant headroom and
/// EBITDA warnings attached.
pub fn simulate(input: &SimulationInput) -> CovenantResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();

    let (result, scorer_warnings) = run_period(input)?;
    let mut warnings = headroom_warnings(&result.covenants);
    warnings.extend(scorer_warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "month": input.month,
        "risk_series": "ebitda_history followed by the current period's ebitda",
        "is_compliant": "financial covenant met, ESG target met, risk tier not high",
        "audit_hash": "sha256 over canonical inputs and outputs, month excluded",
        "coefficients": {
            "sustainability_discount": input.terms.covenants.sustainability_discount,
            "sustainability_penalty": input.terms.covenants.sustainability_penalty,
            "default_risk_premium": input.terms.covenants.default_risk_premium,
        },
    });

    Ok(with_metadata(
        "Sustainability-Linked Loan Simulation",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// One pass over the period: the result plus the risk scorer's warnings.
fn run_period(input: &SimulationInput) -> CovenantResult<(SimulationResult, Vec<String>)> {
    validate(input)?;
    let terms = &input.terms;

    let covenants = assess(&input.financial, &input.esg, &terms.covenants)?;

    let series = scored_series(input);
    let risk = assess_risk(&series, Some(input.financial.cash_reserves))?;

    let rate = apply_ratchet(
        covenants.esg_target_met,
        covenants.financial_covenant_met,
        terms,
    )?;

    let is_compliant = covenants.financial_covenant_met
        && covenants.esg_target_met
        && risk.tier != RiskTier::High;

    let message = compose_message(&covenants, risk.tier, is_compliant);

    let record = AuditRecord {
        financial: input.financial.clone(),
        esg: input.esg.clone(),
        terms: terms.clone(),
        ebitda_history: input.ebitda_history.clone(),
        final_rate: rate.final_rate,
        risk_score: risk.risk_score,
        is_compliant,
    };
    let audit_hash = audit_hash(&record);

    debug!(
        month = %input.month,
        new_interest_rate = %rate.final_rate,
        risk_score = %risk.risk_score,
        is_compliant,
        %audit_hash,
        "simulation complete"
    );

    let result = SimulationResult {
        new_interest_rate: rate.final_rate,
        risk_score: risk.risk_score,
        is_compliant,
        audit_hash,
        message,
        status: rate.status,
        risk_tier: risk.tier,
        breakdown: SimulationBreakdown {
            base_rate: terms.base_rate,
            margin: terms.base_margin,
            risk_score: risk.risk_score,
            volatility: risk.volatility,
            probability_of_default: risk.probability_of_default,
        },
        rate_breakdown: rate.breakdown,
        covenants,
    };
    Ok((result, risk_warnings(&series, &risk)))
}

fn validate(input: &SimulationInput) -> CovenantResult<()> {
    input.financial.validate()?;
    input.esg.validate()?;
    input.terms.validate()?;
    for (i, v) in input.ebitda_history.iter().enumerate() {
        ensure_non_negative(&format!("ebitda_history[{i}]"), *v)?;
    }
    Ok(())
}

fn scored_series(input: &SimulationInput) -> Vec<Money> {
    let mut series = input.ebitda_history.clone();
    series.push(input.financial.ebitda);
    series
}

fn compose_message(covenants: &CovenantTestOutput, tier: RiskTier, is_compliant: bool) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(4);
    parts.push(if covenants.esg_target_met {
        RateStatus::EsgDiscountApplied.message()
    } else {
        RateStatus::EsgPenaltyApplied.message()
    });
    if !covenants.financial_covenant_met {
        parts.push(RateStatus::Breach.message());
    }
    if tier == RiskTier::High {
        parts.push("High Default Risk Detected");
    }
    if !is_compliant {
        parts.push("Compliance Breach");
    }
    parts.join(". ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CovenantError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn january() -> SimulationInput {
        SimulationInput {
            financial: MonthlyFinancials {
                revenue: dec!(125_000_000),
                ebitda: dec!(35_000_000),
                debt: dec!(120_000_000),
                cash_reserves: dec!(15_000_000),
            },
            esg: EsgMetrics {
                carbon_emissions: dec!(180),
                diversity_score: Some(dec!(42)),
            },
            month: "January".into(),
            ebitda_history: vec![dec!(34_000_000), dec!(34_500_000)],
            terms: LoanTerms::default(),
        }
    }

    #[test]
    fn test_compliant_period() {
        let r = run_simulation(&january()).unwrap();
        assert_eq!(r.new_interest_rate, dec!(6.40));
        assert_eq!(r.status, RateStatus::EsgDiscountApplied);
        assert!(r.is_compliant);
        assert_eq!(r.risk_tier, RiskTier::Low);
        assert_eq!(r.message, "Rate Reduced: ESG Target Met");
        assert_eq!(r.breakdown.base_rate, dec!(4.5));
        assert_eq!(r.breakdown.margin, dec!(2.0));
        assert_eq!(r.audit_hash.len(), 64);
    }

    #[test]
    fn test_financial_breach_message() {
        let mut input = january();
        input.financial.debt = dec!(150_000_000); // 4.29x
        let r = run_simulation(&input).unwrap();
        assert_eq!(r.new_interest_rate, dec!(8.40));
        assert_eq!(r.status, RateStatus::Breach);
        assert!(!r.is_compliant);
        assert_eq!(
            r.message,
            "Rate Reduced: ESG Target Met. BREACH: Financial Covenant Violated. Compliance Breach"
        );
    }

    #[test]
    fn test_esg_miss_is_not_compliant() {
        let mut input = january();
        input.esg.carbon_emissions = dec!(250);
        let r = run_simulation(&input).unwrap();
        assert_eq!(r.new_interest_rate, dec!(6.55));
        assert!(!r.is_compliant);
        assert_eq!(r.message, "Rate Increased: ESG Target Missed. Compliance Breach");
    }

    #[test]
    fn test_high_risk_blocks_compliance_without_repricing() {
        let mut input = january();
        input.financial.ebitda = dec!(70);
        input.financial.debt = dec!(100);
        input.financial.cash_reserves = Decimal::ZERO;
        input.ebitda_history = vec![dec!(100), dec!(130)];
        let r = run_simulation(&input).unwrap();
        assert_eq!(r.risk_tier, RiskTier::High);
        assert!(r.covenants.all_passing);
        assert!(!r.is_compliant);
        // high risk does not move the rate
        assert_eq!(r.new_interest_rate, dec!(6.40));
        assert_eq!(
            r.message,
            "Rate Reduced: ESG Target Met. High Default Risk Detected. Compliance Breach"
        );
    }

    #[test]
    fn test_deterministic() {
        let a = run_simulation(&january()).unwrap();
        let b = run_simulation(&january()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_month_does_not_affect_hash() {
        let a = run_simulation(&january()).unwrap();
        let mut input = january();
        input.month = "February".into();
        let b = run_simulation(&input).unwrap();
        assert_eq!(a.audit_hash, b.audit_hash);
    }

    #[test]
    fn test_debt_change_flips_hash() {
        let a = run_simulation(&january()).unwrap();
        let mut input = january();
        input.financial.debt += Decimal::ONE;
        let b = run_simulation(&input).unwrap();
        assert_ne!(a.audit_hash, b.audit_hash);
    }

    #[test]
    fn test_hash_verifies_against_record() {
        let input = january();
        let r = run_simulation(&input).unwrap();
        let record = AuditRecord {
            financial: input.financial.clone(),
            esg: input.esg.clone(),
            terms: input.terms.clone(),
            ebitda_history: input.ebitda_history.clone(),
            final_rate: r.new_interest_rate,
            risk_score: r.risk_score,
            is_compliant: r.is_compliant,
        };
        assert!(crate::audit::verify_audit_hash(&record, &r.audit_hash));
    }

    #[test]
    fn test_zero_ebitda_rejected() {
        let mut input = january();
        input.financial.ebitda = Decimal::ZERO;
        assert!(matches!(
            run_simulation(&input).unwrap_err(),
            CovenantError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_negative_history_names_index() {
        let mut input = january();
        input.ebitda_history = vec![dec!(1), dec!(-1)];
        match run_simulation(&input).unwrap_err() {
            CovenantError::InvalidInput { field, .. } => assert_eq!(field, "ebitda_history[1]"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_collects_warnings() {
        let mut input = january();
        input.financial.debt = dec!(133_000_000); // 3.8x, inside 10% of 4.0x
        input.ebitda_history.clear();
        let out = simulate(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Leverage")));
        assert!(out.warnings.iter().any(|w| w.contains("Single EBITDA")));
    }

    #[test]
    fn test_envelope_carries_the_same_result_and_trend_warning() {
        let mut input = january();
        input.ebitda_history = vec![dec!(40_000_000), dec!(40_000_000)];
        input.financial.ebitda = dec!(30_000_000); // -25% on the prior period
        let bare = run_simulation(&input).unwrap();
        let out = simulate(&input).unwrap();
        assert_eq!(out.result, bare);
        assert!(out.warnings.iter().any(|w| w.contains("EBITDA fell 25%")));
    }
}
