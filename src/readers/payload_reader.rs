//! Reader for the climate service's JSON payloads saved to disk.

use crate::error::Result;
use crate::models::{ObservationTableBuilder, SamplingDuration, SeriesKey};
use crate::utils::{parse_timestamp, parse_timestamp_as};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationPayload {
    station_triplet: String,
    #[serde(default)]
    data: Vec<ElementPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementPayload {
    station_element: StationElement,
    #[serde(default)]
    values: Vec<ValuePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationElement {
    element_code: String,
    #[serde(default)]
    duration_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValuePayload {
    date: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Stations(Vec<StationPayload>),
    Station(StationPayload),
}

/// Flattens station/element/value payloads into a table builder.
pub struct PayloadReader;

impl PayloadReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_payload(&self, path: &Path) -> Result<ObservationTableBuilder> {
        let file = File::open(path)?;
        let builder = self.read_from(BufReader::new(file))?;
        debug!("Read payload {}", path.display());
        Ok(builder)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<ObservationTableBuilder> {
        let stations = match serde_json::from_reader::<_, Payload>(reader)? {
            Payload::Stations(stations) => stations,
            Payload::Station(station) => vec![station],
        };

        let mut builder = ObservationTableBuilder::new();

        for station in stations {
            for element in station.data {
                let key = SeriesKey::new(
                    station.station_triplet.clone(),
                    &element.station_element.element_code,
                );
                let duration = element
                    .station_element
                    .duration_name
                    .as_deref()
                    .and_then(SamplingDuration::parse);

                builder.declare(key.clone());

                for point in element.values {
                    let timestamp = match duration {
                        Some(duration) => parse_timestamp_as(&point.date, duration),
                        None => parse_timestamp(&point.date).map(|(ts, _)| ts),
                    };
                    let timestamp = match timestamp {
                        Ok(ts) => ts,
                        Err(e) => {
                            warn!("Dropping {} value: {}", key, e);
                            continue;
                        }
                    };

                    match point.value {
                        Value::Null => builder.push(key.clone(), timestamp, None),
                        Value::Number(n) => builder.push(key.clone(), timestamp, n.as_f64()),
                        Value::String(s) => builder.push_raw(key.clone(), timestamp, &s),
                        other => builder.push_raw(key.clone(), timestamp, &other.to_string()),
                    };
                }
            }
        }

        Ok(builder)
    }
}

impl Default for PayloadReader {
    fn default() -> Self {
        Self::new()
    }
}
