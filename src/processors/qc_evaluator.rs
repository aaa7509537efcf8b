use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::QcConfig;
use crate::models::{
    AnnotatedTable, DailyReference, ObservationTable, QcFlag, QcSeries, Series, SeriesKey,
    SkipReason, SkippedColumn, StationId,
};
use crate::processors::reference_aggregator::ReferenceAggregator;
use crate::processors::rules::{first_violation, rules_for};

enum ColumnOutcome {
    Annotated(QcSeries),
    Reference,
    Skipped(SkipReason),
}

/// Applies the ordered QC rules to every series of an observation table.
pub struct QcEvaluator {
    config: QcConfig,
    parallel: bool,
}

impl QcEvaluator {
    pub fn new(config: QcConfig) -> Self {
        Self {
            config,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    /// Evaluate the whole table. Never fails: columns that cannot be
    /// evaluated are carried through unannotated and listed as skipped.
    pub fn evaluate(&self, table: &ObservationTable) -> AnnotatedTable {
        if table.is_empty() {
            info!(
                "Empty observation table ({} rows, {} columns); nothing to evaluate",
                table.num_rows(),
                table.num_columns()
            );
        }

        let aggregator = ReferenceAggregator::new(self.config.reference_quantity.clone());
        let references = aggregator.aggregate(table);
        let aligned: HashMap<StationId, Vec<Option<DailyReference>>> = references
            .iter()
            .map(|(station, series)| (station.clone(), series.align(table.index())))
            .collect();

        let evaluate_column = |(key, series): (&SeriesKey, &Series)| {
            let reference = aligned.get(&key.station).map(Vec::as_slice);
            (key.clone(), self.classify_column(key, series, reference))
        };

        let outcomes: Vec<(SeriesKey, ColumnOutcome)> = if self.parallel {
            table.columns().par_iter().map(evaluate_column).collect()
        } else {
            table.columns().iter().map(evaluate_column).collect()
        };

        let mut annotated = AnnotatedTable {
            index: table.index().to_vec(),
            annotations: BTreeMap::new(),
            passthrough: BTreeMap::new(),
            references,
            skipped: Vec::new(),
        };

        for (key, outcome) in outcomes {
            match outcome {
                ColumnOutcome::Annotated(qc) => {
                    annotated.annotations.insert(key, qc);
                }
                ColumnOutcome::Reference => {
                    if let Some(series) = table.column(&key) {
                        annotated.passthrough.insert(key, series.clone());
                    }
                }
                ColumnOutcome::Skipped(reason) => {
                    if let Some(series) = table.column(&key) {
                        annotated.passthrough.insert(key.clone(), series.clone());
                    }
                    annotated.skipped.push(SkippedColumn { key, reason });
                }
            }
        }

        let flagged: usize = annotated
            .annotations
            .values()
            .map(|qc| qc.count(QcFlag::RangeError) + qc.count(QcFlag::Suspect))
            .sum();
        info!(
            "QC evaluation complete: {} series annotated, {} observations flagged, {} series skipped",
            annotated.annotations.len(),
            flagged,
            annotated.skipped.len()
        );

        annotated
    }

    fn classify_column(
        &self,
        key: &SeriesKey,
        series: &Series,
        reference: Option<&[Option<DailyReference>]>,
    ) -> ColumnOutcome {
        if self.config.is_reference(&key.quantity) {
            return ColumnOutcome::Reference;
        }

        if !series.has_numeric() {
            if series.rejected > 0 {
                warn!(
                    "Skipping malformed column {}: none of its {} values are numeric",
                    key, series.rejected
                );
                return ColumnOutcome::Skipped(SkipReason::NonNumeric);
            }
            debug!("Skipping column {}: no observations", key);
            return ColumnOutcome::Skipped(SkipReason::Empty);
        }

        if series.rejected > 0 {
            debug!(
                "Column {} has {} non-numeric values treated as missing",
                key, series.rejected
            );
        }

        ColumnOutcome::Annotated(self.evaluate_series(key, series, reference))
    }

    /// Evaluate one series against its station's aligned reference.
    ///
    /// `reference`, when given, must be aligned to the series' rows.
    pub fn evaluate_series(
        &self,
        key: &SeriesKey,
        series: &Series,
        reference: Option<&[Option<DailyReference>]>,
    ) -> QcSeries {
        let rules = rules_for(&self.config, &key.quantity);
        let mut qc = QcSeries::capture(&series.values);

        for row in 0..qc.len() {
            let Some(value) = qc.raw[row] else {
                continue;
            };
            let day_reference = reference.and_then(|r| r.get(row)).and_then(Option::as_ref);

            if let Some(flag) = first_violation(&rules, value, day_reference) {
                qc.reject(row, flag);
            }
        }

        debug!(
            "Evaluated {}: {} valid, {} range errors, {} suspect",
            key,
            qc.count(QcFlag::Valid),
            qc.count(QcFlag::RangeError),
            qc.count(QcFlag::Suspect)
        );

        qc
    }
}

impl Default for QcEvaluator {
    fn default() -> Self {
        Self::new(QcConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    const STATION: &str = "1050:CO:SNTL";

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn key(quantity: &str) -> SeriesKey {
        SeriesKey::new(STATION, quantity)
    }

    /// Reference readings for day 1: max 80, min 40, mean 60.
    fn table_with(values: &[(&str, u32, f64)]) -> ObservationTable {
        let mut builder = ObservationTable::builder();
        builder.push(key("TOBS"), ts(1, 4), Some(40.0));
        builder.push(key("TOBS"), ts(1, 10), Some(60.0));
        builder.push(key("TOBS"), ts(1, 16), Some(80.0));
        for (quantity, day, value) in values {
            builder.push(key(quantity), ts(*day, 0), Some(*value));
        }
        builder.build()
    }

    fn outcome(table: &AnnotatedTable, quantity: &str, day: u32) -> (QcFlag, Option<f64>) {
        let row = table.index.binary_search(&ts(day, 0)).unwrap();
        let qc = &table.annotations[&key(quantity)];
        (qc.flags[row], qc.cleaned[row])
    }

    #[test]
    fn test_max_exceeding_reference_is_suspect() {
        let table = table_with(&[("TMAX", 1, 90.0)]);
        let annotated = QcEvaluator::default().evaluate(&table);
        assert_eq!(outcome(&annotated, "TMAX", 1), (QcFlag::Suspect, None));
    }

    #[test]
    fn test_boundary_is_valid() {
        let table = table_with(&[("TMAX", 1, 85.0), ("TMIN", 1, 35.0), ("TAVG", 1, 65.0)]);
        let annotated = QcEvaluator::default().evaluate(&table);
        assert_eq!(outcome(&annotated, "TMAX", 1), (QcFlag::Valid, Some(85.0)));
        assert_eq!(outcome(&annotated, "TMIN", 1), (QcFlag::Valid, Some(35.0)));
        assert_eq!(outcome(&annotated, "TAVG", 1), (QcFlag::Valid, Some(65.0)));
    }

    #[test]
    fn test_range_error_takes_precedence() {
        let table = table_with(&[("TMAX", 1, 200.0)]);
        let annotated = QcEvaluator::default().evaluate(&table);
        assert_eq!(outcome(&annotated, "TMAX", 1), (QcFlag::RangeError, None));
    }

    #[test]
    fn test_day_without_reference_uses_range_only() {
        let table = table_with(&[("TMAX", 2, 131.0), ("TMIN", 2, -20.0)]);
        let annotated = QcEvaluator::default().evaluate(&table);
        assert_eq!(outcome(&annotated, "TMAX", 2), (QcFlag::RangeError, None));
        assert_eq!(outcome(&annotated, "TMIN", 2), (QcFlag::Valid, Some(-20.0)));
    }

    #[test]
    fn test_reference_column_is_not_annotated() {
        let table = table_with(&[("TMAX", 1, 70.0)]);
        let annotated = QcEvaluator::default().evaluate(&table);
        assert!(annotated.annotation(&key("TOBS")).is_none());
        assert!(annotated.passthrough.contains_key(&key("TOBS")));
        assert!(annotated.skipped.is_empty());
    }

    #[test]
    fn test_malformed_column_is_skipped() {
        let mut builder = ObservationTable::builder();
        builder.push_raw(key("TMAX"), ts(1, 0), "sensor fault");
        builder.push_raw(key("TMIN"), ts(1, 0), "30");
        builder.declare(key("TAVG"));
        let table = builder.build();

        let annotated = QcEvaluator::default().evaluate(&table);
        assert!(annotated.annotation(&key("TMAX")).is_none());
        assert!(annotated.annotation(&key("TMIN")).is_some());
        assert_eq!(
            annotated.skipped,
            vec![
                SkippedColumn {
                    key: key("TAVG"),
                    reason: SkipReason::Empty
                },
                SkippedColumn {
                    key: key("TMAX"),
                    reason: SkipReason::NonNumeric
                },
            ]
        );
    }

    #[test]
    fn test_nan_is_a_range_error() {
        let series = Series::new(vec![Some(f64::NAN), Some(70.0)]);
        let qc = QcEvaluator::default().evaluate_series(&key("TMAX"), &series, None);

        assert_eq!(qc.flags, vec![QcFlag::RangeError, QcFlag::Valid]);
        assert_eq!(qc.cleaned[0], None);
        assert!(qc.raw[0].is_some_and(f64::is_nan));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let annotated = QcEvaluator::default().evaluate(&ObservationTable::default());
        assert!(annotated.is_empty());
        assert!(annotated.annotations.is_empty());
        assert!(annotated.skipped.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let table = table_with(&[
            ("TMAX", 1, 90.0),
            ("TMIN", 1, 20.0),
            ("TAVG", 1, 61.0),
            ("TMAX", 2, 140.0),
        ]);
        let parallel = QcEvaluator::default().evaluate(&table);
        let sequential = QcEvaluator::default().with_parallel(false).evaluate(&table);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_custom_margin() {
        let config = QcConfig {
            margin: 15.0,
            ..QcConfig::default()
        };
        let table = table_with(&[("TMAX", 1, 90.0)]);
        let annotated = QcEvaluator::new(config).evaluate(&table);
        assert_eq!(outcome(&annotated, "TMAX", 1), (QcFlag::Valid, Some(90.0)));
    }
}
