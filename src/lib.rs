pub mod config;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod simulation_engine;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
