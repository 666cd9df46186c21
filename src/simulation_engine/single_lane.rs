use crate::config::{ConfigError, RoadSettings, SimulationConfig};
use crate::flow_analyzer::traffic_data::TrafficDataSample;
use crate::simulation_engine::lanes::{traversal, Grid, LaneId, Occupancy, TickFrame};
use crate::simulation_engine::road::{
    gap_ahead, insert_from_queue, insert_or_queue, percent_draw, ArrivalQueue, Road, TickTally,
};
use crate::simulation_engine::vehicles::Vehicle;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Single-lane road: the classic Nagel-Schreckenberg automaton.
#[derive(Debug)]
pub struct SingleLaneRoad<R: RngCore = SmallRng> {
    settings: RoadSettings,
    grid: Grid,
    queue: ArrivalQueue,
    rng: R,
}

impl SingleLaneRoad<SmallRng> {
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let settings = config.road_settings()?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Ok(Self::new(settings, rng))
    }
}

impl<R: RngCore> SingleLaneRoad<R> {
    pub fn new(settings: RoadSettings, rng: R) -> Self {
        Self {
            settings,
            grid: Grid::single_lane(settings.cell_count),
            queue: ArrivalQueue::default(),
            rng,
        }
    }

    pub fn settings(&self) -> &RoadSettings {
        &self.settings
    }

    /// Puts a vehicle anywhere on the lane, bypassing the entry.
    #[cfg(any(test, feature = "test_utils"))]
    pub fn place_at(&mut self, index: usize, vehicle: Vehicle) -> bool {
        use crate::simulation_engine::road::lane_free_check;
        if !lane_free_check(&self.grid, index, LaneId::Right, vehicle.length()) {
            return false;
        }
        self.grid.place(LaneId::Right, index, vehicle);
        true
    }

    /// Random slowdown or acceleration towards max speed.
    fn apply_kinetics(&mut self, vehicle: &mut Vehicle) {
        if percent_draw(&mut self.rng) > self.settings.deceleration_threshold {
            if vehicle.speed() < self.settings.max_speed {
                vehicle.accelerate();
            }
        } else {
            vehicle.decelerate();
        }
    }
}

impl<R: RngCore> Road for SingleLaneRoad<R> {
    fn insert(&mut self, mut vehicle: Vehicle) {
        if vehicle.speed() > self.settings.max_speed {
            vehicle.set_speed(self.settings.max_speed);
        }
        insert_or_queue(&mut self.grid, &mut self.queue, vehicle);
    }

    fn update(&mut self) -> TrafficDataSample {
        let cell_count = self.settings.cell_count;
        let grid = std::mem::replace(&mut self.grid, Grid::single_lane(cell_count));
        let mut frame = TickFrame::begin(grid);
        let mut tally = TickTally::default();

        for (index, lane) in traversal(cell_count, &[LaneId::Right]) {
            let Some(mut vehicle) = frame.pick_up(lane, index) else {
                continue;
            };

            self.apply_kinetics(&mut vehicle);

            let gap = gap_ahead(&frame, index, lane);
            if vehicle.speed() as usize > gap {
                vehicle.set_speed(gap as u32);
            }

            let new_index = index + vehicle.speed() as usize;
            if new_index < cell_count {
                tally.record(&vehicle);
                frame.settle(lane, new_index, vehicle);
            } else {
                log::debug!("vehicle {} left the road", vehicle.id());
                tally.exit();
            }
        }
        self.grid = frame.finish();

        if let Some(index) = insert_from_queue(&mut self.grid, &mut self.queue) {
            if let Some(vehicle) = self.grid.occupant(LaneId::Right, index) {
                tally.record(vehicle);
            }
        }

        let sample = tally.into_sample(cell_count, vec![self.to_str()]);
        log::trace!(
            "tick: avg speed {:.2}, density {:.3}, flux {}, queued {}",
            sample.avg_speed,
            sample.density,
            sample.flux,
            self.queue.len()
        );
        sample
    }

    fn to_str(&self) -> String {
        self.grid
            .lane(LaneId::Right)
            .to_str(self.settings.cell_count)
    }

    fn size(&self) -> usize {
        self.settings.cell_count
    }

    fn lane_count(&self) -> usize {
        1
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn queue(&self) -> &ArrivalQueue {
        &self.queue
    }
}
