use chrono::NaiveDateTime;
use std::fmt::Write;

use crate::models::{AnnotatedTable, QcFlag, QcSeries, SeriesKey};

/// One row of a raw-vs-cleaned comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonPoint {
    pub timestamp: NaiveDateTime,
    pub raw: f64,
    pub cleaned: Option<f64>,
    pub flag: QcFlag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagCounts {
    pub valid: usize,
    pub range_errors: usize,
    pub suspect: usize,
}

impl FlagCounts {
    pub fn total(&self) -> usize {
        self.valid + self.range_errors + self.suspect
    }

    pub fn flagged(&self) -> usize {
        self.range_errors + self.suspect
    }

    fn add(&mut self, flag: QcFlag) {
        match flag {
            QcFlag::Valid => self.valid += 1,
            QcFlag::RangeError => self.range_errors += 1,
            QcFlag::Suspect => self.suspect += 1,
        }
    }
}

/// Borrowed view of one evaluated series with its raw companion.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonPair<'a> {
    pub key: &'a SeriesKey,
    pub index: &'a [NaiveDateTime],
    pub raw: &'a [Option<f64>],
    pub cleaned: &'a [Option<f64>],
    pub flags: &'a [QcFlag],
}

impl<'a> ComparisonPair<'a> {
    fn new(key: &'a SeriesKey, index: &'a [NaiveDateTime], qc: &'a QcSeries) -> Self {
        Self {
            key,
            index,
            raw: &qc.raw,
            cleaned: &qc.cleaned,
            flags: &qc.flags,
        }
    }

    /// Rows that carry a raw observation, in time order.
    pub fn points(&self) -> impl Iterator<Item = ComparisonPoint> + 'a {
        let Self {
            index,
            raw,
            cleaned,
            flags,
            ..
        } = *self;

        index.iter().enumerate().filter_map(move |(row, timestamp)| {
            raw[row].map(|raw| ComparisonPoint {
                timestamp: *timestamp,
                raw,
                cleaned: cleaned[row],
                flag: flags[row],
            })
        })
    }

    pub fn flag_counts(&self) -> FlagCounts {
        let mut counts = FlagCounts::default();
        for point in self.points() {
            counts.add(point.flag);
        }
        counts
    }
}

/// Read-only raw-vs-cleaned views over an annotated table.
pub struct ComparisonReporter<'a> {
    table: &'a AnnotatedTable,
}

impl<'a> ComparisonReporter<'a> {
    pub fn new(table: &'a AnnotatedTable) -> Self {
        Self { table }
    }

    /// Every evaluated series, in station then quantity order.
    pub fn pairings(&self) -> impl Iterator<Item = ComparisonPair<'a>> + 'a {
        let index = self.table.index.as_slice();
        self.table
            .annotations
            .iter()
            .map(move |(key, qc)| ComparisonPair::new(key, index, qc))
    }

    /// `None` for reference, skipped or unknown series.
    pub fn pair(&self, key: &SeriesKey) -> Option<ComparisonPair<'a>> {
        let (key, qc) = self.table.annotations.get_key_value(key)?;
        Some(ComparisonPair::new(key, &self.table.index, qc))
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        writeln!(summary, "=== Raw vs Cleaned Comparison ===").ok();
        writeln!(summary).ok();
        writeln!(
            summary,
            "{:<28} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "Series", "Obs", "Valid", "Range", "Suspect", "Kept %"
        )
        .ok();

        for pair in self.pairings() {
            let counts = pair.flag_counts();
            let kept = if counts.total() == 0 {
                0.0
            } else {
                100.0 * counts.valid as f64 / counts.total() as f64
            };
            writeln!(
                summary,
                "{:<28} {:>8} {:>8} {:>8} {:>8} {:>7.1}%",
                pair.key.to_string(),
                counts.total(),
                counts.valid,
                counts.range_errors,
                counts.suspect,
                kept
            )
            .ok();
        }

        let passthrough: Vec<String> = self
            .table
            .passthrough
            .keys()
            .map(|k| k.to_string())
            .collect();
        if !passthrough.is_empty() {
            writeln!(summary).ok();
            writeln!(summary, "Not evaluated: {}", passthrough.join(", ")).ok();
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Series;
    use chrono::NaiveDate;

    fn table() -> AnnotatedTable {
        let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut qc = QcSeries::capture(&[Some(70.0), None, Some(90.0), Some(200.0)]);
        qc.reject(2, QcFlag::Suspect);
        qc.reject(3, QcFlag::RangeError);

        let mut table = AnnotatedTable {
            index: (0..4)
                .map(|d| (day + chrono::Duration::days(d)).and_hms_opt(0, 0, 0).unwrap())
                .collect(),
            ..Default::default()
        };
        table.annotations.insert(SeriesKey::new("A", "TMAX"), qc);
        table.passthrough.insert(
            SeriesKey::new("A", "TOBS"),
            Series::new(vec![Some(60.0), None, None, None]),
        );
        table
    }

    #[test]
    fn test_pair_points_skip_missing_raw() {
        let table = table();
        let reporter = ComparisonReporter::new(&table);
        let pair = reporter.pair(&SeriesKey::new("A", "TMAX")).unwrap();

        let points: Vec<ComparisonPoint> = pair.points().collect();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].cleaned, Some(70.0));
        assert_eq!(points[1].raw, 90.0);
        assert_eq!(points[1].cleaned, None);
        assert_eq!(points[2].flag, QcFlag::RangeError);

        let counts = pair.flag_counts();
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.flagged(), 2);
    }

    #[test]
    fn test_pair_is_none_without_raw_companion() {
        let table = table();
        let reporter = ComparisonReporter::new(&table);
        assert!(reporter.pair(&SeriesKey::new("A", "TOBS")).is_none());
        assert!(reporter.pair(&SeriesKey::new("B", "TMAX")).is_none());
        assert_eq!(reporter.pairings().count(), 1);
    }

    #[test]
    fn test_generate_summary() {
        let table = table();
        let summary = ComparisonReporter::new(&table).generate_summary();
        assert!(summary.contains("A_TMAX"));
        assert!(summary.contains("Not evaluated: A_TOBS"));
    }
}
