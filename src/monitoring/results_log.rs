use crate::errors::ResultsLogError;
use crate::shared_data::{SimulationReport, SimulationStatus};
use crate::simulation_engine::directions::Direction;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of the results log: a direction's metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub run_id: u64,
    pub status: SimulationStatus,
    pub direction: Direction,
    pub average_waiting_time: Option<f64>,
    pub max_waiting_time: Option<f64>,
    pub max_queue_length: usize,
    pub vehicles_processed: usize,
    pub efficiency_score: Option<f64>,
}

/// Seconds since the Unix epoch, used as a run id.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn rows_for(report: &SimulationReport, run_id: u64) -> Vec<ResultRow> {
    report
        .directions
        .iter()
        .map(|m| ResultRow {
            run_id,
            status: report.status,
            direction: m.direction,
            average_waiting_time: m.average_waiting_time,
            max_waiting_time: m.max_waiting_time,
            max_queue_length: m.max_queue_length,
            vehicles_processed: m.vehicles_processed,
            efficiency_score: report.efficiency_score,
        })
        .collect()
}

/// Appends one row per direction to `path`, writing the header only when
/// the file is new. Returns the number of rows written.
pub fn append_report(
    path: impl AsRef<Path>,
    report: &SimulationReport,
    run_id: u64,
) -> Result<usize, ResultsLogError> {
    let path = path.as_ref();
    let rows = rows_for(report, run_id);
    if rows.is_empty() {
        return Ok(0);
    }

    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    log::debug!("Appended {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

pub fn read_history(path: impl AsRef<Path>) -> Result<Vec<ResultRow>, ResultsLogError> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}
