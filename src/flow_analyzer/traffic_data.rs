// traffic_data.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate state of the road after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficDataSample {
    /// Mean floored speed of the vehicles on the road, in cells per tick.
    pub avg_speed: f32,
    /// Cells covered by vehicle bodies over all cells of all lanes.
    pub density: f32,
    /// Vehicles that left the road during the tick.
    pub flux: f32,
    /// One rendered string per lane; index 0 is the right lane.
    pub road_snapshot: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no runs to average")]
    NoRuns,

    #[error("run has {found} lanes, expected {expected}")]
    LaneCountMismatch { expected: usize, found: usize },

    #[error("unexpected csv header: {0}")]
    UnexpectedHeader(String),

    #[error("invalid value {value:?} in column {column} of row {row}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Time series of samples for one run, stored column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficData {
    lane_count: usize,
    avg_speed: Vec<f32>,
    density: Vec<f32>,
    flux: Vec<f32>,
    road_snapshot: Vec<Vec<String>>,
}

impl TrafficData {
    pub fn new(lane_count: usize) -> Self {
        Self {
            lane_count,
            avg_speed: Vec::new(),
            density: Vec::new(),
            flux: Vec::new(),
            road_snapshot: Vec::new(),
        }
    }

    /// Appends a sample. Snapshots are cut or padded to the lane count.
    pub fn add_sample(&mut self, sample: &TrafficDataSample) {
        self.avg_speed.push(sample.avg_speed);
        self.density.push(sample.density);
        self.flux.push(sample.flux);
        let mut snapshot: Vec<String> = sample
            .road_snapshot
            .iter()
            .take(self.lane_count)
            .cloned()
            .collect();
        snapshot.resize(self.lane_count, String::new());
        self.road_snapshot.push(snapshot);
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn len(&self) -> usize {
        self.avg_speed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avg_speed.is_empty()
    }

    pub fn avg_speed(&self) -> &[f32] {
        &self.avg_speed
    }

    pub fn density(&self) -> &[f32] {
        &self.density
    }

    pub fn flux(&self) -> &[f32] {
        &self.flux
    }

    pub fn snapshots(&self) -> &[Vec<String>] {
        &self.road_snapshot
    }

    pub fn sample(&self, tick: usize) -> Option<TrafficDataSample> {
        Some(TrafficDataSample {
            avg_speed: *self.avg_speed.get(tick)?,
            density: *self.density.get(tick)?,
            flux: *self.flux.get(tick)?,
            road_snapshot: self.road_snapshot.get(tick)?.clone(),
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = TrafficDataSample> + '_ {
        (0..self.len()).filter_map(move |tick| self.sample(tick))
    }

    /// The whole run as `;`-separated csv text.
    pub fn to_csv(&self) -> Result<String, AnalysisError> {
        crate::monitoring::report::to_csv_string(self)
    }

    /// Column names of the csv export.
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec!["avg_speed", "density", "flux", "lane_right"];
        if self.lane_count > 1 {
            header.push("lane_left");
        }
        header
    }

    pub fn mean_avg_speed(&self) -> f32 {
        mean(&self.avg_speed)
    }

    pub fn mean_density(&self) -> f32 {
        mean(&self.density)
    }

    pub fn total_flux(&self) -> f32 {
        self.flux.iter().sum()
    }

    /// Tick-by-tick mean of several runs, truncated to the shortest run.
    /// Snapshots are taken from the first run.
    pub fn average(runs: &[TrafficData]) -> Result<TrafficData, AnalysisError> {
        let first = runs.first().ok_or(AnalysisError::NoRuns)?;
        if let Some(other) = runs.iter().find(|r| r.lane_count != first.lane_count) {
            return Err(AnalysisError::LaneCountMismatch {
                expected: first.lane_count,
                found: other.lane_count,
            });
        }
        let ticks = runs.iter().map(TrafficData::len).min().unwrap_or(0);
        let count = runs.len() as f32;
        let column_mean = |column: fn(&TrafficData) -> &[f32]| -> Vec<f32> {
            (0..ticks)
                .map(|tick| runs.iter().map(|r| column(r)[tick]).sum::<f32>() / count)
                .collect()
        };

        Ok(TrafficData {
            lane_count: first.lane_count,
            avg_speed: column_mean(TrafficData::avg_speed),
            density: column_mean(TrafficData::density),
            flux: column_mean(TrafficData::flux),
            road_snapshot: first.road_snapshot[..ticks].to_vec(),
        })
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}
