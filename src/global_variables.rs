// Road geometry
pub const METERS_PER_CELL: u32 = 5;
pub const ROAD_LENGTH_M: u32 = 1200;
pub const MAX_SPEED_MS: u32 = 25;

// Lowest speed a two-lane vehicle is allowed to slow down to, as a share of max speed.
pub const MIN_SPEED_RATIO: f32 = 0.4;

// Share of the road (in percent, measured from the far end) that has a left lane.
pub const LEFT_LANE_PORTION: u8 = 50;

// Random thresholds, compared against a draw in [0, 100).
// A vehicle decelerates when draw <= RAND_DECELERATION_THRESHOLD (3 % by default).
pub const RAND_DECELERATION_THRESHOLD: u32 = 2;
// A vehicle overtakes only when draw > RAND_OVERTAKE_THRESHOLD (79 % by default).
pub const RAND_OVERTAKE_THRESHOLD: u32 = 20;

// Arrivals
pub const HOUR_SEC: u64 = 3600;
pub const ARRIVAL_INTERVAL: f64 = 3.0;
pub const CAR_PORTION_RATIO: u32 = 829;
pub const BUS_PORTION_RATIO: u32 = 4;
pub const TRUCK_PORTION_RATIO: u32 = 167;
pub const MIN_INITIAL_SPEED: u32 = 1;
pub const MAX_INITIAL_SPEED: u32 = 4;

// CSV export
pub const CSV_DELIMITER: u8 = b';';
