// simulation_engine/mod.rs
pub mod lanes;
pub mod road;
pub mod simulation;
pub mod single_lane;
pub mod two_lane;
pub mod vehicles;
