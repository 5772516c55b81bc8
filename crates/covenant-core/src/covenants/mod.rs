pub mod evaluator;

pub use evaluator::{evaluate_covenants, leverage_ratio, CovenantTestInput, CovenantTestOutput};
