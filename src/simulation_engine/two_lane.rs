use crate::config::{ConfigError, RoadSettings, SimulationConfig};
use crate::flow_analyzer::traffic_data::TrafficDataSample;
use crate::simulation_engine::lanes::{traversal, Grid, LaneId, Occupancy, TickFrame};
use crate::simulation_engine::road::{
    gap_ahead, insert_from_queue, insert_or_queue, lane_free_check, percent_draw, ArrivalQueue,
    Road, TickTally,
};
use crate::simulation_engine::vehicles::Vehicle;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Two-lane road. Vehicles enter on the RIGHT lane; the LEFT lane exists
/// from `left_lane_begin` to the far end and is used for overtaking.
///
/// A tick walks positions from the far end to the entry and, at every
/// position, the LEFT lane before the RIGHT one. Lane-change checks against
/// the other lane therefore see moved vehicles ahead and unmoved vehicles
/// behind; this is part of the model, not true parallel update.
#[derive(Debug)]
pub struct TwoLaneRoad<R: RngCore = SmallRng> {
    settings: RoadSettings,
    grid: Grid,
    queue: ArrivalQueue,
    rng: R,
}

impl TwoLaneRoad<SmallRng> {
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let settings = config.road_settings()?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Ok(Self::new(settings, rng))
    }
}

impl<R: RngCore> TwoLaneRoad<R> {
    pub fn new(settings: RoadSettings, rng: R) -> Self {
        Self {
            settings,
            grid: Grid::two_lane(settings.cell_count, settings.left_lane_begin),
            queue: ArrivalQueue::default(),
            rng,
        }
    }

    pub fn settings(&self) -> &RoadSettings {
        &self.settings
    }

    /// Puts a vehicle anywhere on the road, bypassing the entry.
    #[cfg(any(test, feature = "test_utils"))]
    pub fn place_at(&mut self, lane: LaneId, index: usize, vehicle: Vehicle) -> bool {
        if !lane_free_check(&self.grid, index, lane, vehicle.length()) {
            return false;
        }
        self.grid.place(lane, index, vehicle);
        true
    }

    /// LEFT lane drivers and drivers at the speed floor never brake on a
    /// random draw; everybody else brakes when the draw fails.
    fn apply_kinetics(&mut self, vehicle: &mut Vehicle, lane: LaneId) {
        let draw = percent_draw(&mut self.rng);
        let keeps_pace = lane == LaneId::Left || vehicle.speed() <= self.settings.min_speed;
        if draw > self.settings.deceleration_threshold || keeps_pace {
            if vehicle.speed() < self.settings.max_speed {
                vehicle.accelerate();
            }
        } else {
            vehicle.decelerate_above(self.settings.min_speed);
        }
    }

    /// Moves along the LEFT lane, then merges back right if the target cell is free.
    fn left_lane_move(&self, frame: &TickFrame, index: usize, vehicle: &mut Vehicle) -> (LaneId, usize) {
        clamp_to_gap(vehicle, gap_ahead(frame, index, LaneId::Left));
        let new_index = index + vehicle.speed() as usize;
        if lane_free_check(frame, new_index, LaneId::Right, vehicle.length()) {
            (LaneId::Right, new_index)
        } else {
            (LaneId::Left, new_index)
        }
    }

    /// Stays RIGHT unless overtaking pays off and the LEFT target is free.
    fn right_lane_move(&mut self, frame: &TickFrame, index: usize, vehicle: &mut Vehicle) -> (LaneId, usize) {
        let gap_right = gap_ahead(frame, index, LaneId::Right);
        // The overtake draw is only taken once the first two conditions hold.
        let overtake = index > self.settings.left_lane_begin
            && vehicle.speed() as usize > gap_right
            && percent_draw(&mut self.rng) > self.settings.overtake_threshold
            && gap_ahead(frame, index, LaneId::Left) > gap_right;

        if overtake {
            let speed = (vehicle.speed() as usize).min(gap_ahead(frame, index, LaneId::Left));
            let new_index = index + speed;
            if lane_free_check(frame, new_index, LaneId::Left, vehicle.length()) {
                clamp_to_gap(vehicle, speed);
                log::debug!("vehicle {} overtakes at cell {}", vehicle.id(), index);
                return (LaneId::Left, new_index);
            }
        }

        clamp_to_gap(vehicle, gap_right);
        (LaneId::Right, index + vehicle.speed() as usize)
    }
}

fn clamp_to_gap(vehicle: &mut Vehicle, gap: usize) {
    if vehicle.speed() as usize > gap {
        vehicle.set_speed(gap as u32);
    }
}

impl<R: RngCore> Road for TwoLaneRoad<R> {
    fn insert(&mut self, mut vehicle: Vehicle) {
        let speed = vehicle
            .speed()
            .max(self.settings.min_speed)
            .min(self.settings.max_speed);
        if speed != vehicle.speed() {
            vehicle.set_speed(speed);
        }
        insert_or_queue(&mut self.grid, &mut self.queue, vehicle);
    }

    fn update(&mut self) -> TrafficDataSample {
        let cell_count = self.settings.cell_count;
        let empty = Grid::two_lane(cell_count, self.settings.left_lane_begin);
        let mut frame = TickFrame::begin(std::mem::replace(&mut self.grid, empty));
        let mut tally = TickTally::default();

        for (index, lane) in traversal(cell_count, &[LaneId::Left, LaneId::Right]) {
            let Some(mut vehicle) = frame.pick_up(lane, index) else {
                continue;
            };

            self.apply_kinetics(&mut vehicle, lane);

            let (target_lane, new_index) = match lane {
                LaneId::Left => self.left_lane_move(&frame, index, &mut vehicle),
                LaneId::Right => self.right_lane_move(&frame, index, &mut vehicle),
            };

            if new_index < cell_count {
                tally.record(&vehicle);
                frame.settle(target_lane, new_index, vehicle);
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

        let snapshot = vec![
            self.grid.lane(LaneId::Right).to_str(cell_count),
            self.grid.lane(LaneId::Left).to_str(cell_count),
        ];
        let sample = tally.into_sample(2 * cell_count, snapshot);
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
        let cell_count = self.settings.cell_count;
        format!(
            "{}\n{}",
            self.grid.lane(LaneId::Left).to_str(cell_count),
            self.grid.lane(LaneId::Right).to_str(cell_count)
        )
    }

    fn size(&self) -> usize {
        self.settings.cell_count
    }

    fn lane_count(&self) -> usize {
        2
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn queue(&self) -> &ArrivalQueue {
        &self.queue
    }
}
