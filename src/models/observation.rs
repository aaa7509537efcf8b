use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::models::station::{QuantityCode, SeriesKey, StationId};

/// One numeric column of the observation table, aligned to the table index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub values: Vec<Option<f64>>,
    /// Input cells that could not be coerced to a number and were stored as missing.
    pub rejected: usize,
}

impl Series {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self {
            values,
            rejected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied().flatten()
    }

    pub fn numeric_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn has_numeric(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }
}

/// Time-indexed table holding one series per (station, quantity).
///
/// The index is strictly ascending and unique; every series has exactly
/// one slot per index entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    index: Vec<NaiveDateTime>,
    columns: BTreeMap<SeriesKey, Series>,
}

impl ObservationTable {
    pub fn builder() -> ObservationTableBuilder {
        ObservationTableBuilder::new()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &BTreeMap<SeriesKey, Series> {
        &self.columns
    }

    pub fn column(&self, key: &SeriesKey) -> Option<&Series> {
        self.columns.get(key)
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn stations(&self) -> BTreeSet<StationId> {
        self.columns.keys().map(|k| k.station.clone()).collect()
    }

    pub fn quantities(&self) -> BTreeSet<QuantityCode> {
        self.columns.keys().map(|k| k.quantity.clone()).collect()
    }

    pub fn station_columns<'a>(
        &'a self,
        station: &'a StationId,
    ) -> impl Iterator<Item = (&'a SeriesKey, &'a Series)> + 'a {
        self.columns
            .iter()
            .filter(move |(key, _)| &key.station == station)
    }

    pub fn row_of(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.index.binary_search(&timestamp).ok()
    }

    pub fn value(&self, key: &SeriesKey, timestamp: NaiveDateTime) -> Option<f64> {
        let row = self.row_of(timestamp)?;
        self.columns.get(key).and_then(|s| s.get(row))
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.index.first(), self.index.last()) {
            (Some(first), Some(last)) => Some((first.date(), last.date())),
            _ => None,
        }
    }

    /// Restrict the table to the given stations, keeping the full index.
    pub fn select_stations(&self, stations: &[StationId]) -> ObservationTable {
        let wanted: BTreeSet<&StationId> = stations.iter().collect();
        let columns = self
            .columns
            .iter()
            .filter(|(key, _)| wanted.contains(&key.station))
            .map(|(key, series)| (key.clone(), series.clone()))
            .collect();

        ObservationTable {
            index: self.index.clone(),
            columns,
        }
    }
}

/// Accumulates observations from any number of inputs and assembles the
/// deduplicated, sorted [`ObservationTable`].
#[derive(Debug, Default)]
pub struct ObservationTableBuilder {
    cells: BTreeMap<SeriesKey, BTreeMap<NaiveDateTime, Option<f64>>>,
    rejected: HashMap<SeriesKey, usize>,
    duplicates: usize,
}

impl ObservationTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation. Returns false if the (series, timestamp) pair was
    /// already present, in which case the first value is kept.
    pub fn push(&mut self, key: SeriesKey, timestamp: NaiveDateTime, value: Option<f64>) -> bool {
        let value = value.filter(|v| !v.is_nan());
        let series = self.cells.entry(key).or_default();

        if series.contains_key(&timestamp) {
            self.duplicates += 1;
            return false;
        }

        series.insert(timestamp, value);
        true
    }

    /// Add an observation given as text. Blank cells are missing; cells that
    /// do not parse as a number are stored as missing and counted as rejected.
    /// A dropped duplicate never counts as rejected.
    pub fn push_raw(&mut self, key: SeriesKey, timestamp: NaiveDateTime, raw: &str) -> bool {
        let trimmed = raw.trim();
        let (value, rejected) = if trimmed.is_empty() {
            (None, false)
        } else {
            match trimmed.parse::<f64>() {
                Ok(v) => (Some(v), false),
                Err(_) => (None, true),
            }
        };

        if !self.push(key.clone(), timestamp, value) {
            return false;
        }
        if rejected {
            *self.rejected.entry(key).or_default() += 1;
        }
        true
    }

    /// Register a series that may have no observations at all.
    pub fn declare(&mut self, key: SeriesKey) {
        self.cells.entry(key).or_default();
    }

    /// Drop everything not belonging to `station`.
    pub fn retain_station(&mut self, station: &StationId) {
        self.cells.retain(|key, _| &key.station == station);
        self.rejected.retain(|key, _| &key.station == station);
    }

    /// Fold another builder in after this one; its duplicates lose to ours.
    pub fn merge(&mut self, other: ObservationTableBuilder) {
        self.duplicates += other.duplicates;

        for (key, count) in other.rejected {
            *self.rejected.entry(key).or_default() += count;
        }

        for (key, cells) in other.cells {
            let series = self.cells.entry(key).or_default();
            for (timestamp, value) in cells {
                if series.contains_key(&timestamp) {
                    self.duplicates += 1;
                } else {
                    series.insert(timestamp, value);
                }
            }
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn build(self) -> ObservationTable {
        let index: Vec<NaiveDateTime> = self
            .cells
            .values()
            .flat_map(|cells| cells.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let positions: HashMap<NaiveDateTime, usize> =
            index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

        let mut columns = BTreeMap::new();
        for (key, cells) in self.cells {
            let mut values = vec![None; index.len()];
            for (timestamp, value) in cells {
                values[positions[&timestamp]] = value;
            }
            let rejected = self.rejected.get(&key).copied().unwrap_or(0);
            columns.insert(key, Series { values, rejected });
        }

        debug!(
            "Assembled observation table: {} rows x {} columns ({} duplicate observations dropped)",
            index.len(),
            columns.len(),
            self.duplicates
        );

        ObservationTable { index, columns }
    }
}
