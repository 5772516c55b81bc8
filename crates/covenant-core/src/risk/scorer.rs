use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::volatility::{coefficient_of_variation_pct, validate_series};
use crate::error::CovenantError;
use crate::types::*;
use crate::CovenantResult;

pub const MODERATE_RISK_THRESHOLD: Decimal = dec!(50);
pub const HIGH_RISK_THRESHOLD: Decimal = dec!(80);
const LOW_MODERATE_MESSAGE_THRESHOLD: Decimal = dec!(25);

/// (volatility %, score) knots. Scores are linear between knots and flat at
/// 100 past the last one.
const VOLATILITY_CURVE: [(Decimal, Decimal); 5] = [
    (dec!(0), dec!(0)),
    (dec!(10), dec!(25)),
    (dec!(20), dec!(50)),
    (dec!(30), dec!(80)),
    (dec!(50), dec!(100)),
];

/// Full credit is earned once cash covers this fraction of the latest EBITDA.
const CASH_COVER_FOR_FULL_CREDIT: Decimal = dec!(0.5);
const MAX_CASH_CREDIT: Decimal = dec!(20);

/// Period-on-period EBITDA decline (%) over which the trend penalty ramps in.
const TREND_DECLINE_FLOOR_PCT: Decimal = dec!(5);
const TREND_DECLINE_SPAN_PCT: Decimal = dec!(10);
const MAX_TREND_PENALTY: Decimal = dec!(15);

const MAX_SCORE: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInput {
    /// Oldest first; the last value is the current period.
    pub ebitda_values: Vec<Money>,
    #[serde(default)]
    pub cash_reserves: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// < 50 low, 50 to < 80 moderate, >= 80 high.
    pub fn from_score(score: Decimal) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskTier::High
        } else if score >= MODERATE_RISK_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub volatility_component: Decimal,
    pub cash_buffer_credit: Decimal,
    pub trend_penalty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskOutput {
    /// 0-100
    pub risk_score: Decimal,
    /// Coefficient of variation of EBITDA, percent
    pub volatility: Decimal,
    /// 0-1
    pub probability_of_default: Decimal,
    pub tier: RiskTier,
    /// Latest period-on-period EBITDA change, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_trend_pct: Option<Decimal>,
    pub components: RiskComponents,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score default risk from EBITDA volatility, the cash buffer and the latest
/// EBITDA trend.
pub fn score_risk(input: &RiskInput) -> CovenantResult<ComputationOutput<RiskOutput>> {
    let start = Instant::now();

    let output = assess_risk(&input.ebitda_values, input.cash_reserves)?;
    let warnings = risk_warnings(&input.ebitda_values, &output);

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "volatility": "sample stdev / mean x 100",
        "volatility_curve": VOLATILITY_CURVE
            .iter()
            .map(|(v, s)| [v.to_string(), s.to_string()])
            .collect::<Vec<_>>(),
        "cash_buffer_credit": "20 x min(cash / latest ebitda, 0.5) / 0.5",
        "trend_penalty": "15 x clamp((decline_pct - 5) / 10, 0, 1)",
        "probability_of_default": "risk_score / 100",
        "tiers": { "moderate": MODERATE_RISK_THRESHOLD, "high": HIGH_RISK_THRESHOLD },
    });

    Ok(with_metadata(
        "Volatility-Adjusted Default Risk Scoring",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn assess_risk(
    ebitda_values: &[Money],
    cash_reserves: Option<Money>,
) -> CovenantResult<RiskOutput> {
    validate_series(ebitda_values)?;
    let cash = cash_reserves.unwrap_or(Decimal::ZERO);
    ensure_non_negative("cash_reserves", cash)?;

    let volatility = coefficient_of_variation_pct(ebitda_values)?;
    let latest = ebitda_values[ebitda_values.len() - 1];
    let trend = trend_pct(ebitda_values)?;

    let volatility_component = volatility_component(volatility);
    let cash_buffer_credit = cash_buffer_credit(cash, latest);
    let trend_penalty = trend.map(trend_penalty).unwrap_or(Decimal::ZERO);

    let raw = volatility_component - cash_buffer_credit + trend_penalty;
    let risk_score = round_half_away(raw.max(Decimal::ZERO).min(MAX_SCORE), 2);
    let probability_of_default = round_half_away(risk_score / MAX_SCORE, 4);
    let tier = RiskTier::from_score(risk_score);

    debug!(
        %volatility,
        %volatility_component,
        %cash_buffer_credit,
        %trend_penalty,
        %risk_score,
        tier = tier.as_str(),
        "risk scored"
    );

    Ok(RiskOutput {
        risk_score,
        volatility: round_half_away(volatility, 2),
        probability_of_default,
        tier,
        ebitda_trend_pct: trend.map(|t| round_half_away(t, 2)),
        components: RiskComponents {
            volatility_component: round_half_away(volatility_component, 2),
            cash_buffer_credit: round_half_away(cash_buffer_credit, 2),
            trend_penalty: round_half_away(trend_penalty, 2),
        },
        message: risk_message(risk_score).to_string(),
    })
}

pub(crate) fn risk_warnings(ebitda_values: &[Money], output: &RiskOutput) -> Vec<String> {
    let mut warnings = Vec::new();
    if ebitda_values.len() == 1 {
        warnings.push(
            "Single EBITDA observation; volatility is zero and the minimum volatility score applies."
                .into(),
        );
    }
    if let Some(trend) = output.ebitda_trend_pct {
        if trend < -TREND_DECLINE_FLOOR_PCT {
            warnings.push(format!(
                "EBITDA fell {}% in the latest period.",
                (-trend).normalize()
            ));
        }
    }
    warnings
}

fn risk_message(score: Decimal) -> &'static str {
    if score >= HIGH_RISK_THRESHOLD {
        "HIGH RISK: Elevated default probability detected"
    } else if score >= MODERATE_RISK_THRESHOLD {
        "MODERATE RISK: Monitor closely"
    } else if score >= LOW_MODERATE_MESSAGE_THRESHOLD {
        "LOW-MODERATE RISK: Stable operations"
    } else {
        "LOW RISK: Strong financial position"
    }
}

/// Piecewise-linear interpolation along `VOLATILITY_CURVE`.
fn volatility_component(volatility_pct: Decimal) -> Decimal {
    let last = VOLATILITY_CURVE[VOLATILITY_CURVE.len() - 1];
    if volatility_pct >= last.0 {
        return last.1;
    }
    for pair in VOLATILITY_CURVE.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if volatility_pct <= hi.0 {
            let t = (volatility_pct - lo.0) / (hi.0 - lo.0);
            return lo.1 + t * (hi.1 - lo.1);
        }
    }
    last.1
}

/// Zero latest EBITDA with positive cash earns full credit.
fn cash_buffer_credit(cash: Money, latest_ebitda: Money) -> Decimal {
    if cash <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // None means a zero or vanishing denominator: cover is unbounded
    let cover = cash
        .checked_div(latest_ebitda)
        .map_or(CASH_COVER_FOR_FULL_CREDIT, |c| c.min(CASH_COVER_FOR_FULL_CREDIT));
    MAX_CASH_CREDIT * cover / CASH_COVER_FOR_FULL_CREDIT
}

/// Change of the last value against the one before it, percent. Undefined
/// (None) when the prior period is zero.
fn trend_pct(values: &[Money]) -> CovenantResult<Option<Decimal>> {
    if values.len() < 2 {
        return Ok(None);
    }
    let prev = values[values.len() - 2];
    let cur = values[values.len() - 1];
    if prev.is_zero() {
        return Ok(None);
    }
    cur.checked_sub(prev)
        .and_then(|delta| delta.checked_div(prev))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(Some)
        .ok_or_else(|| {
            CovenantError::invalid(
                format!("ebitda_values[{}]", values.len() - 1),
                "Latest EBITDA change exceeds the representable decimal range.",
            )
        })
}

fn trend_penalty(trend_pct: Decimal) -> Decimal {
    let decline = -trend_pct;
    let t = ((decline - TREND_DECLINE_FLOOR_PCT) / TREND_DECLINE_SPAN_PCT)
        .max(Decimal::ZERO)
        .min(Decimal::ONE);
    MAX_TREND_PENALTY * t
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
