// monitoring/report.rs
//
// Csv export/import of a run and a png chart of its time series.

use crate::flow_analyzer::traffic_data::{AnalysisError, TrafficData, TrafficDataSample};
use crate::global_variables::CSV_DELIMITER;
use plotters::prelude::*;
use std::error::Error;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const VALUE_COLUMNS: usize = 3;

/// Writes one header row and one `;`-separated row per tick.
pub fn write_csv<W: Write>(data: &TrafficData, writer: W) -> Result<(), AnalysisError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(writer);
    wtr.write_record(data.header())?;
    for tick in 0..data.len() {
        let mut record = vec![
            format!("{:.6}", data.avg_speed()[tick]),
            format!("{:.6}", data.density()[tick]),
            format!("{:.6}", data.flux()[tick]),
        ];
        record.extend(data.snapshots()[tick].iter().cloned());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(data: &TrafficData) -> Result<String, AnalysisError> {
    let mut buffer = Vec::new();
    write_csv(data, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn save_csv<P: AsRef<Path>>(data: &TrafficData, path: P) -> Result<(), AnalysisError> {
    let file = File::create(path.as_ref())?;
    write_csv(data, file)?;
    log::info!("{} ticks written to {}", data.len(), path.as_ref().display());
    Ok(())
}

/// Parses an export produced by [`write_csv`]. The lane count is taken
/// from the header.
pub fn read_csv<R: Read>(reader: R) -> Result<TrafficData, AnalysisError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let lane_count = headers.len().saturating_sub(VALUE_COLUMNS);
    let expected = TrafficData::new(lane_count).header();
    if !(1..=2).contains(&lane_count) || !headers.iter().eq(expected.iter().copied()) {
        let found: Vec<&str> = headers.iter().collect();
        return Err(AnalysisError::UnexpectedHeader(found.join(";")));
    }

    let mut data = TrafficData::new(lane_count);
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let value = |column: usize| -> Result<f32, AnalysisError> {
            let raw = record.get(column).unwrap_or_default();
            raw.trim().parse().map_err(|_| AnalysisError::InvalidValue {
                row,
                column: expected[column],
                value: raw.to_string(),
            })
        };
        let sample = TrafficDataSample {
            avg_speed: value(0)?,
            density: value(1)?,
            flux: value(2)?,
            road_snapshot: (0..lane_count)
                .map(|lane| record.get(VALUE_COLUMNS + lane).unwrap_or_default().to_string())
                .collect(),
        };
        data.add_sample(&sample);
    }
    Ok(data)
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<TrafficData, AnalysisError> {
    read_csv(File::open(path)?)
}

/// Draws average speed, density and flux over time, one panel each.
pub fn plot_time_series<P: AsRef<Path>>(data: &TrafficData, path: P) -> Result<(), Box<dyn Error>> {
    if data.is_empty() {
        return Err("no samples to plot".into());
    }

    let backend = BitMapBackend::new(path.as_ref(), (1000, 900));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let panels = [
        ("Average speed (cells/s)", data.avg_speed(), RED),
        ("Density", data.density(), BLUE),
        ("Flux (vehicles/s)", data.flux(), GREEN),
    ];
    let areas = root.split_evenly((panels.len(), 1));

    for (area, (caption, values, color)) in areas.iter().zip(panels) {
        let top = values.iter().copied().fold(0.0f32, f32::max);
        let top = if top > 0.0 { top * 1.1 } else { 1.0 };

        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0usize..data.len(), 0f32..top)?;

        chart.configure_mesh().x_desc("tick").draw()?;
        chart.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(tick, &value)| (tick, value)),
            &color,
        ))?;
    }

    root.present()?;
    log::info!("time series chart saved to {}", path.as_ref().display());
    Ok(())
}
