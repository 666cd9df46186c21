/// Different classes of vehicles on the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Car,
    Bus,
    Truck,
}

impl VehicleType {
    /// Number of cells the vehicle body covers.
    pub fn length(self) -> usize {
        match self {
            VehicleType::Car => 1,
            VehicleType::Bus => 2,
            VehicleType::Truck => 3,
        }
    }

    /// Speed gained per accelerating tick, in cells per tick.
    pub fn acceleration(self) -> f32 {
        match self {
            VehicleType::Car => 0.14,
            VehicleType::Bus => 0.05,
            VehicleType::Truck => 0.04,
        }
    }

    /// Speed lost per braking tick, in cells per tick.
    pub fn deceleration(self) -> f32 {
        match self {
            VehicleType::Car => 0.52,
            VehicleType::Bus => 0.1,
            VehicleType::Truck => 0.09,
        }
    }

    /// Character drawn on the body cells behind the front cell.
    pub fn marker(self) -> char {
        match self {
            VehicleType::Car => 'C',
            VehicleType::Bus => 'B',
            VehicleType::Truck => 'T',
        }
    }
}

/// A vehicle travelling along the road.
///
/// The speed is kept as a fraction so that slow classes can build up speed
/// over several ticks; all movement uses the floored value.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    id: u64,
    vehicle_type: VehicleType,
    speed: f32,
}

impl Vehicle {
    pub fn new(id: u64, vehicle_type: VehicleType, initial_speed: u32) -> Self {
        Self {
            id,
            vehicle_type,
            speed: initial_speed as f32,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    pub fn length(&self) -> usize {
        self.vehicle_type.length()
    }

    /// Speed in cells per tick, rounded down.
    pub fn speed(&self) -> u32 {
        self.speed.floor() as u32
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed as f32;
    }

    pub fn accelerate(&mut self) {
        self.speed += self.vehicle_type.acceleration();
    }

    /// Brakes unless that would make the speed negative.
    pub fn decelerate(&mut self) {
        let slowed = self.speed - self.vehicle_type.deceleration();
        if slowed >= 0.0 {
            self.speed = slowed;
        }
    }

    /// Brakes only while the floored speed is above `min_speed`.
    pub fn decelerate_above(&mut self, min_speed: u32) {
        if self.speed() > min_speed {
            self.decelerate();
        }
    }

    /// Rendered cells of this vehicle, rear first: body markers then the speed digit.
    pub fn to_str(&self) -> String {
        let mut cells: String = std::iter::repeat(self.vehicle_type.marker())
            .take(self.length() - 1)
            .collect();
        cells.push(char::from_digit(self.speed().min(35), 36).unwrap_or('+'));
        cells
    }
}
