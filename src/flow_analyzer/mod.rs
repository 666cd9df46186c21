// flow_analyzer/mod.rs
pub mod traffic_data;
