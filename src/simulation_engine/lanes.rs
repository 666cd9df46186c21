use crate::simulation_engine::vehicles::Vehicle;
use std::collections::BTreeMap;

/// Lanes of a road. RIGHT is the entry lane and exists on every road;
/// LEFT is the overtaking lane of the two-lane road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LaneId {
    Right,
    Left,
}

impl LaneId {
    pub fn index(self) -> usize {
        match self {
            LaneId::Right => 0,
            LaneId::Left => 1,
        }
    }
}

/// One lane of cells. Only the front cell of each vehicle is stored;
/// a vehicle of length L at index P covers cells `[P-L+1, P]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    /// Cells below this index are blocked (the LEFT lane has not begun yet).
    pub first_usable: usize,
    vehicles: BTreeMap<usize, Vehicle>,
}

impl Lane {
    pub fn new(first_usable: usize) -> Self {
        Self {
            first_usable,
            vehicles: BTreeMap::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Vehicle> {
        self.vehicles.get(&index)
    }

    /// First stored front cell at or beyond `from`.
    pub fn next_occupied(&self, from: usize) -> Option<(usize, &Vehicle)> {
        self.vehicles.range(from..).next().map(|(&i, v)| (i, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Vehicle)> + '_ {
        self.vehicles.iter().map(|(&i, v)| (i, v))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Cells covered by vehicle bodies.
    pub fn occupied_cells(&self) -> usize {
        self.vehicles.values().map(Vehicle::length).sum()
    }

    fn insert(&mut self, index: usize, vehicle: Vehicle) -> Option<Vehicle> {
        self.vehicles.insert(index, vehicle)
    }

    fn remove(&mut self, index: usize) -> Option<Vehicle> {
        self.vehicles.remove(&index)
    }

    fn emptied(&self) -> Self {
        Lane::new(self.first_usable)
    }

    /// Renders the lane from the entry to the far end.
    pub fn to_str(&self, cell_count: usize) -> String {
        let mut cells: Vec<char> = (0..cell_count)
            .map(|i| if i < self.first_usable { '#' } else { '.' })
            .collect();
        for (front, vehicle) in self.iter() {
            let rendered: Vec<char> = vehicle.to_str().chars().collect();
            let rear = (front + 1).saturating_sub(rendered.len());
            let skipped = rendered.len() - (front + 1 - rear);
            for (offset, c) in rendered.into_iter().skip(skipped).enumerate() {
                if let Some(cell) = cells.get_mut(rear + offset) {
                    *cell = c;
                }
            }
        }
        cells.into_iter().collect()
    }
}

/// Read access to cell occupancy, shared by settled grids and in-flight ticks.
pub trait Occupancy {
    fn cell_count(&self) -> usize;
    fn first_usable(&self, lane: LaneId) -> usize;
    fn occupant(&self, lane: LaneId, index: usize) -> Option<&Vehicle>;
    fn next_occupied(&self, lane: LaneId, from: usize) -> Option<(usize, &Vehicle)>;
}

/// All lanes of a road at the end of a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cell_count: usize,
    lanes: Vec<Lane>,
}

impl Grid {
    pub fn single_lane(cell_count: usize) -> Self {
        Self {
            cell_count,
            lanes: vec![Lane::new(0)],
        }
    }

    pub fn two_lane(cell_count: usize, left_lane_begin: usize) -> Self {
        Self {
            cell_count,
            lanes: vec![Lane::new(0), Lane::new(left_lane_begin)],
        }
    }

    pub fn lane(&self, lane: LaneId) -> &Lane {
        &self.lanes[lane.index()]
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn has_lane(&self, lane: LaneId) -> bool {
        lane.index() < self.lanes.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.lanes.iter().map(Lane::len).sum()
    }

    pub fn occupied_cells(&self) -> usize {
        self.lanes.iter().map(Lane::occupied_cells).sum()
    }

    /// Stores `vehicle` with its front at `index`. Callers check the cells first.
    pub fn place(&mut self, lane: LaneId, index: usize, vehicle: Vehicle) {
        let displaced = self.lanes[lane.index()].insert(index, vehicle);
        debug_assert!(displaced.is_none(), "cell {:?}/{} was occupied", lane, index);
    }

    pub fn take(&mut self, lane: LaneId, index: usize) -> Option<Vehicle> {
        self.lanes[lane.index()].remove(index)
    }

    fn emptied(&self) -> Self {
        Self {
            cell_count: self.cell_count,
            lanes: self.lanes.iter().map(Lane::emptied).collect(),
        }
    }
}

impl Occupancy for Grid {
    fn cell_count(&self) -> usize {
        self.cell_count
    }

    fn first_usable(&self, lane: LaneId) -> usize {
        self.lanes
            .get(lane.index())
            .map_or(usize::MAX, |l| l.first_usable)
    }

    fn occupant(&self, lane: LaneId, index: usize) -> Option<&Vehicle> {
        self.lanes.get(lane.index())?.get(index)
    }

    fn next_occupied(&self, lane: LaneId, from: usize) -> Option<(usize, &Vehicle)> {
        self.lanes.get(lane.index())?.next_occupied(from)
    }
}

/// State of a road while a tick is being processed.
///
/// Vehicles still waiting for their turn sit in `pending`; vehicles that
/// already moved sit in `settled`. Queries see both, so a vehicle observes
/// the new positions of everything processed before it and the old positions
/// of everything still to come.
#[derive(Debug)]
pub struct TickFrame {
    pending: Grid,
    settled: Grid,
}

impl TickFrame {
    pub fn begin(grid: Grid) -> Self {
        let settled = grid.emptied();
        Self {
            pending: grid,
            settled,
        }
    }

    /// Takes a not yet processed vehicle off its cell.
    pub fn pick_up(&mut self, lane: LaneId, index: usize) -> Option<Vehicle> {
        self.pending.take(lane, index)
    }

    pub fn settle(&mut self, lane: LaneId, index: usize, vehicle: Vehicle) {
        self.settled.place(lane, index, vehicle);
    }

    pub fn finish(self) -> Grid {
        debug_assert_eq!(self.pending.vehicle_count(), 0, "unprocessed vehicles");
        self.settled
    }
}

impl Occupancy for TickFrame {
    fn cell_count(&self) -> usize {
        self.settled.cell_count
    }

    fn first_usable(&self, lane: LaneId) -> usize {
        self.settled.first_usable(lane)
    }

    fn occupant(&self, lane: LaneId, index: usize) -> Option<&Vehicle> {
        self.settled
            .occupant(lane, index)
            .or_else(|| self.pending.occupant(lane, index))
    }

    fn next_occupied(&self, lane: LaneId, from: usize) -> Option<(usize, &Vehicle)> {
        match (
            self.settled.next_occupied(lane, from),
            self.pending.next_occupied(lane, from),
        ) {
            (Some(s), Some(p)) => Some(if p.0 < s.0 { p } else { s }),
            (s, p) => s.or(p),
        }
    }
}

/// Order in which a tick visits cells: from the far end towards the entry,
/// and at each position through `lanes` in the given order.
pub fn traversal(cell_count: usize, lanes: &[LaneId]) -> impl Iterator<Item = (usize, LaneId)> + '_ {
    (0..cell_count)
        .rev()
        .flat_map(move |index| lanes.iter().map(move |&lane| (index, lane)))
}
