use crate::error::{ProcessingError, Result};
use crate::models::{ObservationTable, ObservationTableBuilder, StationId};
use crate::readers::{ObservationReader, PayloadReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Long-format `station,element,timestamp,value` CSV
    Csv,
    /// Climate service JSON payload
    Json,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => Some(InputFormat::Csv),
            Some("json") => Some(InputFormat::Json),
            _ => None,
        }
    }
}

/// Reads many input files on blocking worker threads and assembles a
/// single observation table.
pub struct ConcurrentReader {
    max_workers: usize,
    station_filter: Option<String>,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            station_filter: None,
        }
    }

    pub fn with_station_filter(mut self, station: Option<String>) -> Self {
        self.station_filter = station;
        self
    }

    /// Expand directories into their CSV/JSON files (sorted by name).
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| path.is_file() && InputFormat::from_path(path).is_some())
                    .collect();
                entries.sort();
                files.extend(entries);
            } else if InputFormat::from_path(input).is_some() {
                files.push(input.clone());
            } else {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Unsupported input file (expected .csv or .json): {}",
                    input.display()
                )));
            }
        }

        Ok(files)
    }

    /// Read all inputs. Files are merged in the order given, so for
    /// duplicate observations the earliest file wins.
    pub async fn read_all(&self, inputs: &[PathBuf]) -> Result<ObservationTable> {
        let files = Self::collect_inputs(inputs)?;
        let semaphore = Arc::new(Semaphore::new(self.max_workers));

        let handles: Vec<JoinHandle<Result<ObservationTableBuilder>>> = files
            .iter()
            .cloned()
            .map(|path| {
                let semaphore = semaphore.clone();
                let station_filter = self.station_filter.clone();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| ProcessingError::Config(e.to_string()))?;
                    tokio::task::spawn_blocking(move || read_file(&path, station_filter)).await?
                })
            })
            .collect();

        let mut builder = ObservationTableBuilder::new();
        for handle in handles {
            builder.merge(handle.await??);
        }

        let duplicates = builder.duplicates();
        let table = builder.build();

        info!(
            "Loaded {} files: {} stations, {} series, {} rows ({} duplicates dropped)",
            files.len(),
            table.stations().len(),
            table.num_columns(),
            table.num_rows(),
            duplicates
        );

        Ok(table)
    }
}

fn read_file(path: &Path, station_filter: Option<String>) -> Result<ObservationTableBuilder> {
    match InputFormat::from_path(path) {
        Some(InputFormat::Csv) => {
            ObservationReader::with_station_filter(station_filter).read_observations(path)
        }
        Some(InputFormat::Json) => {
            let mut builder = PayloadReader::new().read_payload(path)?;
            if let Some(station) = station_filter {
                builder.retain_station(&StationId::new(station));
            }
            Ok(builder)
        }
        None => Err(ProcessingError::InvalidFormat(format!(
            "Unsupported input file: {}",
            path.display()
        ))),
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
