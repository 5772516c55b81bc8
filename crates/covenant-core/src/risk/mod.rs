pub mod scorer;
pub mod volatility;

pub use scorer::{score_risk, RiskComponents, RiskInput, RiskOutput, RiskTier};
