// simulation.rs
use crate::config::{ConfigError, RoadLayout, RoadSettings, SimulationConfig};
use crate::flow_analyzer::traffic_data::{TrafficData, TrafficDataSample};
use crate::global_variables::{MAX_INITIAL_SPEED, MIN_INITIAL_SPEED};
use crate::simulation_engine::road::Road;
use crate::simulation_engine::single_lane::SingleLaneRoad;
use crate::simulation_engine::two_lane::TwoLaneRoad;
use crate::simulation_engine::vehicles::{Vehicle, VehicleType};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Drives one road: Poisson arrivals at the entry, one `update` per second.
pub struct Simulator {
    config: SimulationConfig,
    settings: RoadSettings,
    road: Box<dyn Road>,
    rng: SmallRng,
    inter_arrival: Exp<f64>,
    next_arrival: u64,
    tick: u64,
    next_vehicle_id: u64,
    inserted: u64,
    exited: u64,
    statistics: TrafficData,
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

/// Builds the road for `layout`; its random source is derived from `rng`.
fn build_road(layout: RoadLayout, settings: RoadSettings, rng: &mut SmallRng) -> Box<dyn Road> {
    let road_rng = SmallRng::from_rng(rng);
    match layout {
        RoadLayout::OneLane => Box::new(SingleLaneRoad::new(settings, road_rng)),
        RoadLayout::TwoLane => Box::new(TwoLaneRoad::new(settings, road_rng)),
    }
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let settings = config.road_settings()?;
        let inter_arrival = Exp::new(1.0 / config.arrival_interval)
            .map_err(|_| ConfigError::InvalidArrivalInterval(config.arrival_interval))?;

        let mut rng = seeded_rng(config.seed);
        let road = build_road(config.layout, settings, &mut rng);
        let statistics = TrafficData::new(road.lane_count());

        let mut simulator = Self {
            config,
            settings,
            road,
            rng,
            inter_arrival,
            next_arrival: 0,
            tick: 0,
            next_vehicle_id: 1,
            inserted: 0,
            exited: 0,
            statistics,
        };
        simulator.next_arrival = simulator.sample_interval();
        Ok(simulator)
    }

    /// Whole ticks until the next arrival.
    fn sample_interval(&mut self) -> u64 {
        self.inter_arrival.sample(&mut self.rng).floor() as u64
    }

    /// Draws a vehicle class by ratio and an initial speed; cars start one faster.
    pub fn spawn_vehicle(&mut self) -> Vehicle {
        let car = u64::from(self.config.car_ratio);
        let bus = u64::from(self.config.bus_ratio);
        let total = car + bus + u64::from(self.config.truck_ratio);
        let draw = self.rng.random_range(0..total);
        let vehicle_type = if draw < car {
            VehicleType::Car
        } else if draw < car + bus {
            VehicleType::Bus
        } else {
            VehicleType::Truck
        };

        let mut speed = self.rng.random_range(MIN_INITIAL_SPEED..=MAX_INITIAL_SPEED);
        if vehicle_type == VehicleType::Car {
            speed += 1;
        }

        let vehicle = Vehicle::new(self.next_vehicle_id, vehicle_type, speed);
        self.next_vehicle_id += 1;
        vehicle
    }

    /// One second of simulated time.
    pub fn step(&mut self) -> TrafficDataSample {
        if self.tick == self.next_arrival {
            let vehicle = self.spawn_vehicle();
            log::debug!(
                "tick {}: {:?} {} arrives at speed {}",
                self.tick,
                vehicle.vehicle_type(),
                vehicle.id(),
                vehicle.speed()
            );
            self.road.insert(vehicle);
            self.inserted += 1;
            self.next_arrival = self.tick + 1 + self.sample_interval();
        }

        let sample = self.road.update();
        self.exited += sample.flux as u64;
        self.statistics.add_sample(&sample);
        self.tick += 1;
        sample
    }

    pub fn simulate(&mut self, seconds: u64) -> &TrafficData {
        log::info!(
            "simulating {} s on a {:?} road of {} cells",
            seconds,
            self.config.layout,
            self.settings.cell_count
        );
        for _ in 0..seconds {
            self.step();
        }
        log::info!(
            "done at tick {}: {} inserted, {} exited, {} on road, {} queued",
            self.tick,
            self.inserted,
            self.exited,
            self.road.vehicles_on_road(),
            self.road.queued_vehicles()
        );
        &self.statistics
    }

    /// Starts over on an empty road of the same layout. A seeded
    /// simulator replays the same run after a reset.
    pub fn reset(&mut self) {
        self.rng = seeded_rng(self.config.seed);
        self.road = build_road(self.config.layout, self.settings, &mut self.rng);
        self.statistics = TrafficData::new(self.road.lane_count());
        self.tick = 0;
        self.next_vehicle_id = 1;
        self.inserted = 0;
        self.exited = 0;
        self.next_arrival = self.sample_interval();
        log::info!("simulator reset");
    }

    pub fn road(&self) -> &dyn Road {
        self.road.as_ref()
    }

    pub fn statistics(&self) -> &TrafficData {
        &self.statistics
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn settings(&self) -> &RoadSettings {
        &self.settings
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn exited(&self) -> u64 {
        self.exited
    }
}
