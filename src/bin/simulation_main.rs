// simulation_main.rs
use ca_traffic::config::{RoadLayout, SimulationConfig};
use ca_traffic::global_variables::HOUR_SEC;
use ca_traffic::monitoring::report::{plot_time_series, save_csv};
use ca_traffic::simulation_engine::simulation::Simulator;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tokio::time::{sleep, Duration};

/// Runs the cellular-automaton road model and exports its time series.
///
/// Options given on the command line override the ones read from `--config`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct InputArgs {
    #[arg(long, value_enum)]
    layout: Option<RoadLayout>,

    /// Simulated seconds, one tick each.
    #[arg(long, default_value_t = HOUR_SEC)]
    seconds: u64,

    /// Road length in meters.
    #[arg(long)]
    road_length: Option<u32>,

    /// Max speed in meters per second.
    #[arg(long)]
    max_speed: Option<u32>,

    /// Share of the road with a left lane, in percent.
    #[arg(long)]
    two_lane_portion: Option<u8>,

    /// Mean seconds between arrivals.
    #[arg(long)]
    arrival_interval: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Ticks per wall-clock second; 0 runs unpaced.
    #[arg(long, default_value_t = 0.0)]
    speed_up: f64,

    /// Print the road after every tick.
    #[arg(long)]
    render: bool,

    /// Csv file for the time series.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Png file for the time series chart.
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Json config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl InputArgs {
    fn simulation_config(&self) -> Result<SimulationConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(road_length) = self.road_length {
            config.road_length_m = road_length;
        }
        if let Some(max_speed) = self.max_speed {
            config.max_speed_ms = max_speed;
        }
        if let Some(portion) = self.two_lane_portion {
            config.two_lane_portion = portion;
        }
        if let Some(interval) = self.arrival_interval {
            config.arrival_interval = interval;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = InputArgs::parse();

    let config = args.simulation_config()?;
    let mut simulator = Simulator::new(config)?;
    let boundary = "=".repeat(simulator.road().size());
    let pace = (args.speed_up > 0.0).then(|| Duration::from_secs_f64(1.0 / args.speed_up));

    log::info!(
        "starting {:?} run for {} s",
        simulator.config().layout,
        args.seconds
    );
    for _ in 0..args.seconds {
        simulator.step();
        if args.render {
            println!("{}", boundary);
            println!("{}", simulator.road().to_str());
        }
        if let Some(pace) = pace {
            sleep(pace).await;
        }
    }
    if args.render {
        println!("{}", boundary);
    }

    let statistics = simulator.statistics();
    println!(
        "ticks: {}, inserted: {}, exited: {}, mean speed: {:.3} cells/s, mean density: {:.3}",
        simulator.tick(),
        simulator.inserted(),
        simulator.exited(),
        statistics.mean_avg_speed(),
        statistics.mean_density()
    );

    if let Some(path) = &args.output {
        if let Err(e) = save_csv(statistics, path) {
            log::warn!("could not write {}: {}", path.display(), e);
        }
    }
    if let Some(path) = &args.chart {
        if let Err(e) = plot_time_series(statistics, path) {
            log::warn!("could not draw {}: {}", path.display(), e);
        }
    }
    Ok(())
}
