use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;
use crate::models::observation::Series;
use crate::models::reference::ReferenceSeries;
use crate::models::station::{SeriesKey, StationId};

/// Outcome of quality control for a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcFlag {
    /// Passed all checks
    Valid,
    /// Outside absolute physical bounds
    RangeError,
    /// Inside bounds but inconsistent with the reference signal for that day
    Suspect,
}

impl QcFlag {
    pub const ALL: [QcFlag; 3] = [QcFlag::Valid, QcFlag::RangeError, QcFlag::Suspect];

    pub fn as_str(&self) -> &'static str {
        match self {
            QcFlag::Valid => "VALID",
            QcFlag::RangeError => "RANGE_ERROR",
            QcFlag::Suspect => "SUSPECT",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, QcFlag::Valid)
    }
}

impl fmt::Display for QcFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QcFlag {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "VALID" => Ok(QcFlag::Valid),
            "RANGE_ERROR" => Ok(QcFlag::RangeError),
            "SUSPECT" => Ok(QcFlag::Suspect),
            other => Err(ProcessingError::InvalidFlag(other.to_string())),
        }
    }
}

/// Raw, cleaned and flag columns produced for one evaluated series.
#[derive(Debug, Clone, PartialEq)]
pub struct QcSeries {
    pub raw: Vec<Option<f64>>,
    pub cleaned: Vec<Option<f64>>,
    pub flags: Vec<QcFlag>,
}

impl QcSeries {
    /// Capture `raw` verbatim with every row provisionally valid.
    pub fn capture(raw: &[Option<f64>]) -> Self {
        Self {
            raw: raw.to_vec(),
            cleaned: raw.to_vec(),
            flags: vec![QcFlag::Valid; raw.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Record a rule violation: the value is suppressed and the flag set.
    pub fn reject(&mut self, row: usize, flag: QcFlag) {
        self.cleaned[row] = None;
        self.flags[row] = flag;
    }

    pub fn count(&self, flag: QcFlag) -> usize {
        self.raw
            .iter()
            .zip(&self.flags)
            .filter(|(raw, f)| raw.is_some() && **f == flag)
            .count()
    }

    pub fn missing_raw(&self) -> usize {
        self.raw.iter().filter(|v| v.is_none()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Column has cells, but none could be read as a number
    NonNumeric,
    /// Column has no observations at all
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedColumn {
    pub key: SeriesKey,
    pub reason: SkipReason,
}

/// The observation table extended with QC annotations.
///
/// Evaluated series live in `annotations`; the reference quantity and any
/// skipped series are carried unchanged in `passthrough`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotatedTable {
    pub index: Vec<NaiveDateTime>,
    pub annotations: BTreeMap<SeriesKey, QcSeries>,
    pub passthrough: BTreeMap<SeriesKey, Series>,
    pub references: BTreeMap<StationId, ReferenceSeries>,
    pub skipped: Vec<SkippedColumn>,
}

impl AnnotatedTable {
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || (self.annotations.is_empty() && self.passthrough.is_empty())
    }

    pub fn annotation(&self, key: &SeriesKey) -> Option<&QcSeries> {
        self.annotations.get(key)
    }

    pub fn stations(&self) -> Vec<StationId> {
        let mut stations: Vec<StationId> = self
            .annotations
            .keys()
            .chain(self.passthrough.keys())
            .map(|k| k.station.clone())
            .collect();
        stations.sort();
        stations.dedup();
        stations
    }

    /// Fold in the result of evaluating a disjoint subset of stations.
    pub fn absorb(&mut self, other: AnnotatedTable) {
        if self.index.is_empty() {
            self.index = other.index;
        }
        self.annotations.extend(other.annotations);
        self.passthrough.extend(other.passthrough);
        self.references.extend(other.references);
        self.skipped.extend(other.skipped);
        self.skipped.sort_by(|a, b| a.key.cmp(&b.key));
    }
}
