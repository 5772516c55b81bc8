pub mod engine;
pub mod wire;

pub use engine::{run_simulation, simulate, SimulationBreakdown, SimulationInput, SimulationResult};
pub use wire::{
    handle_calculate_rate, handle_calculate_risk, CalculateRateRequest, CalculateRateResponse,
    CalculateRiskRequest, CalculateRiskResponse, LoanContext, WireBreakdown,
};
