// monitoring/mod.rs
pub mod report;
