pub mod ratchet;

pub use ratchet::{
    apply_ratchet, calculate_rate, RateBreakdown, RateCalculationResult, RateInput, RateStatus,
};
