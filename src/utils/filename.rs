use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

use crate::models::StationId;

fn date_stamp() -> String {
    let now = Local::now();
    format!("{:02}{:02}{:02}", now.year() % 100, now.month(), now.day())
}

/// Default directory for a run's exports: `output/station-qc-{YYMMDD}`
pub fn generate_default_output_dir() -> PathBuf {
    PathBuf::from("output").join(format!("station-qc-{}", date_stamp()))
}

/// Per-station CSV file inside an export directory
pub fn station_csv_path(dir: &Path, station: &StationId) -> PathBuf {
    dir.join(format!("{}.csv", station.file_stem()))
}

/// Long-format Parquet file inside an export directory
pub fn annotated_parquet_path(dir: &Path) -> PathBuf {
    dir.join(format!("station-qc-annotated-{}.parquet", date_stamp()))
}
