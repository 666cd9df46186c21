// simulation_engine/road.rs
//
// Contract shared by the single-lane and two-lane roads, plus the gap,
// free-cell and admission primitives both update rules are built on.

use crate::flow_analyzer::traffic_data::TrafficDataSample;
use crate::simulation_engine::lanes::{Grid, LaneId, Occupancy};
use crate::simulation_engine::vehicles::Vehicle;
use rand::RngCore;
use std::collections::VecDeque;

/// Gap reported when no vehicle is ahead before the end of the lane.
pub const UNBOUNDED_GAP: usize = usize::MAX;

/// A road segment driven tick by tick.
pub trait Road {
    /// Admits `vehicle` at the entry, or queues it when the entry is blocked.
    fn insert(&mut self, vehicle: Vehicle);

    /// Advances the road by one tick.
    fn update(&mut self) -> TrafficDataSample;

    /// Snapshot of all lanes, one line per lane.
    fn to_str(&self) -> String;

    /// Number of cells per lane.
    fn size(&self) -> usize;

    fn lane_count(&self) -> usize;

    fn grid(&self) -> &Grid;

    fn queue(&self) -> &ArrivalQueue;

    fn vehicles_on_road(&self) -> usize {
        self.grid().vehicle_count()
    }

    fn queued_vehicles(&self) -> usize {
        self.queue().len()
    }
}

/// Vehicles that arrived while the entry was blocked, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ArrivalQueue {
    waiting: VecDeque<Vehicle>,
}

impl ArrivalQueue {
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn front(&self) -> Option<&Vehicle> {
        self.waiting.front()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.waiting.iter().map(Vehicle::id).collect()
    }

    fn push(&mut self, vehicle: Vehicle) {
        self.waiting.push_back(vehicle);
    }
}

/// Free cells between `from` and the rear of the next vehicle in `lane`.
///
/// Returns 0 for positions where the lane has not begun and
/// [`UNBOUNDED_GAP`] when nothing is ahead.
pub fn gap_ahead<O: Occupancy>(view: &O, from: usize, lane: LaneId) -> usize {
    if from < view.first_usable(lane) {
        return 0;
    }
    match view.next_occupied(lane, from) {
        Some((index, leader)) => (index - from).saturating_sub(leader.length()),
        None => UNBOUNDED_GAP,
    }
}

/// Whether a vehicle of `length` cells could have its front at `position`
/// without touching any other vehicle body or a blocked cell.
pub fn lane_free_check<O: Occupancy>(view: &O, position: usize, lane: LaneId, length: usize) -> bool {
    let cell_count = view.cell_count();
    let first_usable = view.first_usable(lane);

    if position >= cell_count || position < first_usable {
        return false;
    }
    if view.occupant(lane, position).is_some() {
        return false;
    }
    // Bodies of vehicles just ahead reaching back into `position`.
    for offset in 1..=2 {
        let ahead = position + offset;
        if ahead >= cell_count {
            break;
        }
        if let Some(vehicle) = view.occupant(lane, ahead) {
            if vehicle.length() > offset {
                return false;
            }
        }
    }
    // Our own body behind `position`.
    for offset in 1..length {
        let Some(behind) = position.checked_sub(offset) else {
            break;
        };
        if behind < first_usable || view.occupant(lane, behind).is_some() {
            return false;
        }
    }
    true
}

/// Entry cell of a vehicle: its whole body just fits behind the road start.
pub fn entry_position(vehicle: &Vehicle) -> usize {
    vehicle.length() - 1
}

/// Places `vehicle` at the entry of the RIGHT lane if the cells are free.
pub(crate) fn admit(grid: &mut Grid, vehicle: Vehicle) -> Result<usize, Vehicle> {
    let position = entry_position(&vehicle);
    if lane_free_check(&*grid, position, LaneId::Right, vehicle.length()) {
        grid.place(LaneId::Right, position, vehicle);
        Ok(position)
    } else {
        Err(vehicle)
    }
}

/// Admits `vehicle`, or appends it to the queue when the entry cells are taken.
/// The queue is not consulted: a short arrival may enter while a longer
/// vehicle is still waiting.
pub(crate) fn insert_or_queue(grid: &mut Grid, queue: &mut ArrivalQueue, vehicle: Vehicle) {
    match admit(grid, vehicle) {
        Ok(position) => log::debug!("vehicle admitted at cell {}", position),
        Err(vehicle) => {
            log::debug!(
                "entry blocked, vehicle {} queued behind {} waiting vehicles",
                vehicle.id(),
                queue.len()
            );
            queue.push(vehicle);
        }
    }
}

/// Tries to admit the head of the queue. Only the head is ever tried.
pub(crate) fn insert_from_queue(grid: &mut Grid, queue: &mut ArrivalQueue) -> Option<usize> {
    let head = queue.front()?;
    let position = entry_position(head);
    if !lane_free_check(&*grid, position, LaneId::Right, head.length()) {
        return None;
    }
    let vehicle = queue.waiting.pop_front()?;
    log::debug!(
        "queued vehicle {} admitted at cell {}, {} still waiting",
        vehicle.id(),
        position,
        queue.len()
    );
    grid.place(LaneId::Right, position, vehicle);
    Some(position)
}

/// Uniform draw in `[0, 100)` compared against the random thresholds.
pub(crate) fn percent_draw<R: RngCore>(rng: &mut R) -> u32 {
    rng.next_u32() % 100
}

/// Per-tick accumulators for the statistics sample.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TickTally {
    speed_sum: u64,
    vehicles: usize,
    occupied_cells: usize,
    flux: usize,
}

impl TickTally {
    /// A vehicle that is on the road at the end of the tick.
    pub fn record(&mut self, vehicle: &Vehicle) {
        self.speed_sum += vehicle.speed() as u64;
        self.vehicles += 1;
        self.occupied_cells += vehicle.length();
    }

    pub fn exit(&mut self) {
        self.flux += 1;
    }

    pub fn into_sample(self, total_cells: usize, road_snapshot: Vec<String>) -> TrafficDataSample {
        let avg_speed = if self.vehicles == 0 {
            0.0
        } else {
            self.speed_sum as f32 / self.vehicles as f32
        };
        let density = if total_cells == 0 {
            0.0
        } else {
            self.occupied_cells as f32 / total_cells as f32
        };
        TrafficDataSample {
            avg_speed,
            density,
            flux: self.flux as f32,
            road_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::vehicles::VehicleType;

    fn vehicle(id: u64, vehicle_type: VehicleType) -> Vehicle {
        Vehicle::new(id, vehicle_type, 0)
    }

    #[test]
    fn gap_counts_cells_to_leader_rear() {
        let mut grid = Grid::single_lane(20);
        grid.place(LaneId::Right, 9, vehicle(1, VehicleType::Truck));
        // truck covers 7..=9
        assert_eq!(gap_ahead(&grid, 3, LaneId::Right), 3);
        assert_eq!(gap_ahead(&grid, 6, LaneId::Right), 0);
        assert_eq!(gap_ahead(&grid, 10, LaneId::Right), UNBOUNDED_GAP);
    }

    #[test]
    fn gap_never_goes_negative() {
        let mut grid = Grid::single_lane(20);
        grid.place(LaneId::Right, 5, vehicle(1, VehicleType::Truck));
        assert_eq!(gap_ahead(&grid, 4, LaneId::Right), 0);
        assert_eq!(gap_ahead(&grid, 5, LaneId::Right), 0);
    }

    #[test]
    fn left_lane_gap_is_zero_before_it_begins() {
        let grid = Grid::two_lane(20, 10);
        assert_eq!(gap_ahead(&grid, 4, LaneId::Left), 0);
        assert_eq!(gap_ahead(&grid, 10, LaneId::Left), UNBOUNDED_GAP);
    }

    #[test]
    fn gap_shrinks_when_vehicle_cuts_in_and_grows_when_leader_leaves() {
        let mut grid = Grid::single_lane(30);
        grid.place(LaneId::Right, 20, vehicle(1, VehicleType::Car));
        let before = gap_ahead(&grid, 5, LaneId::Right);

        grid.place(LaneId::Right, 12, vehicle(2, VehicleType::Bus));
        let cut_in = gap_ahead(&grid, 5, LaneId::Right);
        assert!(cut_in < before);

        let bus = grid.take(LaneId::Right, 12).unwrap();
        grid.place(LaneId::Right, 16, bus);
        let moved_on = gap_ahead(&grid, 5, LaneId::Right);
        assert!(moved_on >= cut_in);
        assert!(moved_on <= before);
    }

    #[test]
    fn free_check_rejects_bodies_reaching_back() {
        let mut grid = Grid::single_lane(20);
        grid.place(LaneId::Right, 6, vehicle(1, VehicleType::Truck));
        // truck covers 4..=6
        assert!(!lane_free_check(&grid, 4, LaneId::Right, 1));
        assert!(!lane_free_check(&grid, 5, LaneId::Right, 1));
        assert!(!lane_free_check(&grid, 6, LaneId::Right, 1));
        assert!(lane_free_check(&grid, 3, LaneId::Right, 1));

        grid.place(LaneId::Right, 12, vehicle(2, VehicleType::Bus));
        // bus covers 11..=12
        assert!(!lane_free_check(&grid, 11, LaneId::Right, 1));
        assert!(lane_free_check(&grid, 10, LaneId::Right, 1));
    }

    #[test]
    fn free_check_rejects_own_body_overlap() {
        let mut grid = Grid::single_lane(20);
        grid.place(LaneId::Right, 3, vehicle(1, VehicleType::Car));
        assert!(!lane_free_check(&grid, 5, LaneId::Right, 3));
        assert!(!lane_free_check(&grid, 4, LaneId::Right, 2));
        assert!(lane_free_check(&grid, 5, LaneId::Right, 2));
        assert!(lane_free_check(&grid, 6, LaneId::Right, 3));
    }

    #[test]
    fn free_check_treats_offsets_behind_entry_as_empty() {
        let grid = Grid::single_lane(20);
        assert!(lane_free_check(&grid, 0, LaneId::Right, 3));
        assert!(lane_free_check(&grid, 1, LaneId::Right, 3));
    }

    #[test]
    fn free_check_respects_bounds_and_blocked_cells() {
        let grid = Grid::two_lane(20, 10);
        assert!(!lane_free_check(&grid, 20, LaneId::Right, 1));
        assert!(!lane_free_check(&grid, 9, LaneId::Left, 1));
        assert!(!lane_free_check(&grid, 11, LaneId::Left, 3));
        assert!(lane_free_check(&grid, 12, LaneId::Left, 3));
    }

    #[test]
    fn blocked_entry_queues_and_queue_drains_in_order() {
        let mut grid = Grid::single_lane(20);
        let mut queue = ArrivalQueue::default();
        grid.place(LaneId::Right, 1, vehicle(1, VehicleType::Car));

        // truck needs cells 0..=2
        insert_or_queue(&mut grid, &mut queue, vehicle(2, VehicleType::Truck));
        // bus needs cells 0..=1
        insert_or_queue(&mut grid, &mut queue, vehicle(3, VehicleType::Bus));
        assert_eq!(queue.ids(), vec![2, 3]);
        assert_eq!(insert_from_queue(&mut grid, &mut queue), None);
        assert_eq!(queue.ids(), vec![2, 3]);

        let blocker = grid.take(LaneId::Right, 1).unwrap();
        grid.place(LaneId::Right, 4, blocker);
        assert_eq!(insert_from_queue(&mut grid, &mut queue), Some(2));
        assert_eq!(queue.ids(), vec![3]);
        assert_eq!(grid.occupant(LaneId::Right, 2).map(Vehicle::id), Some(2));
    }

    #[test]
    fn free_entry_admits_arrival_past_waiting_truck() {
        let mut grid = Grid::single_lane(20);
        let mut queue = ArrivalQueue::default();
        grid.place(LaneId::Right, 2, vehicle(1, VehicleType::Car));

        // truck needs cells 0..=2 and waits
        insert_or_queue(&mut grid, &mut queue, vehicle(2, VehicleType::Truck));
        assert_eq!(queue.ids(), vec![2]);

        // a car only needs cell 0
        insert_or_queue(&mut grid, &mut queue, vehicle(3, VehicleType::Car));
        assert_eq!(queue.ids(), vec![2]);
        assert_eq!(grid.occupant(LaneId::Right, 0).map(Vehicle::id), Some(3));
    }

    #[test]
    fn queue_drain_only_tries_the_head() {
        let mut grid = Grid::single_lane(20);
        let mut queue = ArrivalQueue::default();
        grid.place(LaneId::Right, 2, vehicle(1, VehicleType::Car));
        insert_or_queue(&mut grid, &mut queue, vehicle(2, VehicleType::Truck));
        grid.place(LaneId::Right, 0, vehicle(3, VehicleType::Car));
        insert_or_queue(&mut grid, &mut queue, vehicle(4, VehicleType::Car));
        assert_eq!(queue.ids(), vec![2, 4]);

        // cell 0 frees up: car 4 would fit, the truck still does not
        grid.take(LaneId::Right, 0);
        assert_eq!(insert_from_queue(&mut grid, &mut queue), None);
        assert_eq!(queue.ids(), vec![2, 4]);
    }

    #[test]
    fn empty_queue_inserts_nothing() {
        let mut grid = Grid::single_lane(5);
        let mut queue = ArrivalQueue::default();
        assert_eq!(insert_from_queue(&mut grid, &mut queue), None);
        assert_eq!(grid.vehicle_count(), 0);
    }

    #[test]
    fn tally_without_vehicles_is_zero() {
        let sample = TickTally::default().into_sample(10, vec![String::new()]);
        assert_eq!(sample.avg_speed, 0.0);
        assert_eq!(sample.density, 0.0);
        assert_eq!(sample.flux, 0.0);
    }
}
