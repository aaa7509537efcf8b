use crate::error::{ProcessingError, Result};
use crate::models::{ObservationTableBuilder, SeriesKey};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use crate::utils::parse_timestamp;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// One row of the long-format input: `station,element,timestamp,value`.
#[derive(Debug, Deserialize)]
struct CsvObservation {
    station: String,
    element: String,
    timestamp: String,
    value: Option<String>,
}

/// Reads long-format observation CSV files into a table builder.
pub struct ObservationReader {
    station_filter: Option<String>,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self {
            station_filter: None,
        }
    }

    /// Only keep rows of the given station.
    pub fn with_station_filter(station: Option<String>) -> Self {
        Self {
            station_filter: station,
        }
    }

    pub fn read_observations(&self, path: &Path) -> Result<ObservationTableBuilder> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let builder = self.read_from(reader)?;

        debug!(
            "Read {} ({} duplicate observations)",
            path.display(),
            builder.duplicates()
        );
        Ok(builder)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<ObservationTableBuilder> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .has_headers(true)
            .from_reader(reader);

        let mut builder = ObservationTableBuilder::new();

        for (line, row) in csv_reader.deserialize::<CsvObservation>().enumerate() {
            let row = row?;

            if let Some(ref station) = self.station_filter {
                if &row.station != station {
                    continue;
                }
            }

            if row.station.is_empty() || row.element.is_empty() {
                return Err(ProcessingError::MissingData(format!(
                    "station or element missing on data line {}",
                    line + 1
                )));
            }

            let (timestamp, _) = parse_timestamp(&row.timestamp).map_err(|e| {
                ProcessingError::InvalidFormat(format!("data line {}: {}", line + 1, e))
            })?;

            let key = SeriesKey::new(row.station, row.element);
            match row.value {
                Some(value) => builder.push_raw(key, timestamp, &value),
                None => builder.push(key, timestamp, None),
            };
        }

        Ok(builder)
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}
