pub mod analyst;
pub mod audit;
pub mod covenants;
pub mod monitor;
pub mod rate;
pub mod risk;
