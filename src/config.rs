// src/config.rs

use crate::global_variables::{
    ARRIVAL_INTERVAL, BUS_PORTION_RATIO, CAR_PORTION_RATIO, LEFT_LANE_PORTION, MAX_SPEED_MS,
    METERS_PER_CELL, MIN_SPEED_RATIO, RAND_DECELERATION_THRESHOLD, RAND_OVERTAKE_THRESHOLD,
    ROAD_LENGTH_M, TRUCK_PORTION_RATIO,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Rejected construction parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("road length must be positive")]
    EmptyRoad,

    #[error("road length {0} m is not a multiple of {cell} m per cell", cell = METERS_PER_CELL)]
    RoadLengthNotCellAligned(u32),

    #[error("max speed {0} m/s is below one cell per tick ({cell} m/s)", cell = METERS_PER_CELL)]
    MaxSpeedTooLow(u32),

    #[error("two lane portion {0} % is above 100 %")]
    TwoLanePortionOutOfRange(u8),

    #[error("{name} threshold {value} must be below 100")]
    ThresholdOutOfRange { name: &'static str, value: u32 },

    #[error("arrival interval must be a positive number of seconds, got {0}")]
    InvalidArrivalInterval(f64),

    #[error("at least one vehicle class ratio must be non-zero")]
    NoVehicleClasses,

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which road variant the simulator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RoadLayout {
    #[default]
    OneLane,
    TwoLane,
}

/// Everything the simulator reads at construction time.
///
/// The two thresholds are compared against a draw in `[0, 100)`:
/// a vehicle decelerates with probability `(deceleration_threshold + 1) / 100`
/// and overtakes (once every other condition holds) with probability
/// `(99 - overtake_threshold) / 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub layout: RoadLayout,
    pub road_length_m: u32,
    pub max_speed_ms: u32,
    /// Percentage of the road, measured from the far end, that has a left lane.
    pub two_lane_portion: u8,
    /// Mean time between two arrivals, in seconds.
    pub arrival_interval: f64,
    pub car_ratio: u32,
    pub bus_ratio: u32,
    pub truck_ratio: u32,
    pub deceleration_threshold: u32,
    pub overtake_threshold: u32,
    /// Fixed seed for reproducible runs; entropy seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            layout: RoadLayout::OneLane,
            road_length_m: ROAD_LENGTH_M,
            max_speed_ms: MAX_SPEED_MS,
            two_lane_portion: LEFT_LANE_PORTION,
            arrival_interval: ARRIVAL_INTERVAL,
            car_ratio: CAR_PORTION_RATIO,
            bus_ratio: BUS_PORTION_RATIO,
            truck_ratio: TRUCK_PORTION_RATIO,
            deceleration_threshold: RAND_DECELERATION_THRESHOLD,
            overtake_threshold: RAND_OVERTAKE_THRESHOLD,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config. Missing fields fall back to the defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let config: SimulationConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.road_length_m == 0 {
            return Err(ConfigError::EmptyRoad);
        }
        if self.road_length_m % METERS_PER_CELL != 0 {
            return Err(ConfigError::RoadLengthNotCellAligned(self.road_length_m));
        }
        if self.max_speed_ms < METERS_PER_CELL {
            return Err(ConfigError::MaxSpeedTooLow(self.max_speed_ms));
        }
        if self.two_lane_portion > 100 {
            return Err(ConfigError::TwoLanePortionOutOfRange(self.two_lane_portion));
        }
        if self.deceleration_threshold >= 100 {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "deceleration",
                value: self.deceleration_threshold,
            });
        }
        if self.overtake_threshold >= 100 {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "overtake",
                value: self.overtake_threshold,
            });
        }
        if !(self.arrival_interval.is_finite() && self.arrival_interval > 0.0) {
            return Err(ConfigError::InvalidArrivalInterval(self.arrival_interval));
        }
        if self.car_ratio == 0 && self.bus_ratio == 0 && self.truck_ratio == 0 {
            return Err(ConfigError::NoVehicleClasses);
        }
        Ok(())
    }

    /// Validates the config and converts it into cell units.
    pub fn road_settings(&self) -> Result<RoadSettings, ConfigError> {
        self.validate()?;
        let cell_count = (self.road_length_m / METERS_PER_CELL) as usize;
        let max_speed = self.max_speed_ms / METERS_PER_CELL;
        let min_speed = (max_speed as f32 * MIN_SPEED_RATIO).floor() as u32;
        let left_lane_begin =
            ((100 - self.two_lane_portion) as f32 / 100.0 * cell_count as f32) as usize;

        Ok(RoadSettings {
            cell_count,
            max_speed,
            min_speed,
            left_lane_begin,
            deceleration_threshold: self.deceleration_threshold,
            overtake_threshold: self.overtake_threshold,
        })
    }
}

/// Road parameters in cells and cells per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadSettings {
    pub cell_count: usize,
    pub max_speed: u32,
    /// Only honoured by the two-lane road.
    pub min_speed: u32,
    /// First LEFT lane cell; only used by the two-lane road.
    pub left_lane_begin: usize,
    pub deceleration_threshold: u32,
    pub overtake_threshold: u32,
}
