use serde::{Deserialize, Serialize};
use std::fmt;

/// Station identifier, usually a triplet such as `1234:CO:SNTL`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Station id made safe for use in a file name (`1234:CO:SNTL` -> `1234_CO_SNTL`).
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element code of a measured quantity (`TMAX`, `TMIN`, `TAVG`, `TOBS`, ...).
///
/// Codes are normalised to upper case so that configuration keys and input
/// payloads agree regardless of how they were spelled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QuantityCode(String);

impl QuantityCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for QuantityCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<QuantityCode> for String {
    fn from(code: QuantityCode) -> Self {
        code.0
    }
}

impl fmt::Display for QuantityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one series in the observation table.
///
/// Ordering is by station first, then quantity, which is the column order
/// used by every exporter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub station: StationId,
    pub quantity: QuantityCode,
}

impl SeriesKey {
    pub fn new(station: impl Into<String>, quantity: impl AsRef<str>) -> Self {
        Self {
            station: StationId::new(station),
            quantity: QuantityCode::new(quantity),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.station, self.quantity)
    }
}

/// Native sampling interval of a series, which decides how its timestamps
/// are normalised onto the table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingDuration {
    Daily,
    Hourly,
}

impl SamplingDuration {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Some(SamplingDuration::Daily),
            "HOURLY" => Some(SamplingDuration::Hourly),
            _ => None,
        }
    }
}
