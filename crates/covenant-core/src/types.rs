use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CovenantError;
use crate::CovenantResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentage points (6.5 = 6.5%). Loan pricing is quoted this way.
pub type Percent = Decimal;

/// Multiples (e.g., 3.4x debt/EBITDA)
pub type Multiple = Decimal;

/// Round half away from zero at `dp` decimal places.
///
/// Every rounded figure the engine publishes (rates, scores, volatility,
/// probability of default) goes through here so the convention is uniform:
/// 6.125 -> 6.13, 6.135 -> 6.14.
pub fn round_half_away(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Borrower reporting
// ---------------------------------------------------------------------------

/// One reporting period's financial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFinancials {
    pub revenue: Money,
    pub ebitda: Money,
    pub debt: Money,
    #[serde(default)]
    pub cash_reserves: Money,
}

/// One reporting period's ESG figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMetrics {
    /// tons CO2e
    pub carbon_emissions: Decimal,
    /// 0-100
    #[serde(default)]
    pub diversity_score: Option<Decimal>,
}

impl MonthlyFinancials {
    pub fn validate(&self) -> CovenantResult<()> {
        ensure_non_negative("financial.revenue", self.revenue)?;
        ensure_non_negative("financial.ebitda", self.ebitda)?;
        ensure_non_negative("financial.debt", self.debt)?;
        ensure_non_negative("financial.cash_reserves", self.cash_reserves)?;
        Ok(())
    }
}

impl EsgMetrics {
    pub fn validate(&self) -> CovenantResult<()> {
        ensure_non_negative("esg.carbon_emissions", self.carbon_emissions)?;
        if let Some(score) = self.diversity_score {
            if score < Decimal::ZERO || score > dec!(100) {
                return Err(CovenantError::invalid(
                    "esg.diversity_score",
                    "Diversity score must be between 0 and 100.",
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loan configuration
// ---------------------------------------------------------------------------

/// Per-loan covenant thresholds and ratchet coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantConfig {
    /// Financial covenant ceiling on debt / EBITDA
    pub max_leverage_ratio: Multiple,
    /// Emissions ceiling, tons
    pub esg_target: Decimal,
    /// Percentage points taken off the rate when the ESG target is met
    pub sustainability_discount: Percent,
    /// Percentage points added when the ESG target is missed
    pub sustainability_penalty: Percent,
    /// Percentage points added on a financial covenant breach
    #[serde(default = "default_risk_premium")]
    pub default_risk_premium: Percent,
}

fn default_risk_premium() -> Percent {
    dec!(2.00)
}

impl Default for CovenantConfig {
    fn default() -> Self {
        Self {
            max_leverage_ratio: dec!(4.0),
            esg_target: dec!(200),
            sustainability_discount: dec!(0.10),
            sustainability_penalty: dec!(0.05),
            default_risk_premium: default_risk_premium(),
        }
    }
}

impl CovenantConfig {
    pub fn validate(&self) -> CovenantResult<()> {
        ensure_non_negative("covenants.max_leverage_ratio", self.max_leverage_ratio)?;
        ensure_non_negative("covenants.esg_target", self.esg_target)?;
        ensure_non_negative("covenants.sustainability_discount", self.sustainability_discount)?;
        ensure_non_negative("covenants.sustainability_penalty", self.sustainability_penalty)?;
        ensure_non_negative("covenants.default_risk_premium", self.default_risk_premium)?;
        Ok(())
    }
}

/// Pricing terms fixed at origination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub base_rate: Percent,
    pub base_margin: Percent,
    #[serde(default)]
    pub covenants: CovenantConfig,
}

impl Default for LoanTerms {
    fn default() -> Self {
        Self {
            base_rate: dec!(4.5),
            base_margin: dec!(2.0),
            covenants: CovenantConfig::default(),
        }
    }
}

impl LoanTerms {
    /// Base rate plus margin, before any ratchet adjustment.
    pub fn all_in_base(&self) -> CovenantResult<Percent> {
        self.base_rate
            .checked_add(self.base_margin)
            .ok_or_else(|| {
                CovenantError::invalid("terms.base_margin", "Base rate plus margin overflows.")
            })
    }

    pub fn validate(&self) -> CovenantResult<()> {
        ensure_non_negative("terms.base_rate", self.base_rate)?;
        ensure_non_negative("terms.base_margin", self.base_margin)?;
        self.covenants.validate()?;
        // A discount larger than the all-in rate would price the loan below zero.
        if self.covenants.sustainability_discount > self.all_in_base()? {
            return Err(CovenantError::invalid(
                "covenants.sustainability_discount",
                "Sustainability discount cannot exceed base rate plus margin.",
            ));
        }
        Ok(())
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: Decimal) -> CovenantResult<()> {
    if value < Decimal::ZERO {
        return Err(CovenantError::invalid(field, "Value cannot be negative."));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
