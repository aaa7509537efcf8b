use std::collections::BTreeMap;

use crate::models::{AnnotatedTable, QcFlag, SkipReason, SkippedColumn, StationId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationSummary {
    pub series_evaluated: usize,
    pub observations: usize,
    pub valid: usize,
    pub range_errors: usize,
    pub suspect: usize,
    pub reference_days: usize,
}

impl StationSummary {
    pub fn flagged(&self) -> usize {
        self.range_errors + self.suspect
    }
}

/// Flag counts of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcSummary {
    /// Observations with a raw value across all evaluated series
    pub observations: usize,
    pub valid: usize,
    pub range_errors: usize,
    pub suspect: usize,
    pub missing_raw: usize,
    pub skipped: Vec<SkippedColumn>,
    pub station_statistics: BTreeMap<StationId, StationSummary>,
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

impl QcSummary {
    pub fn from_table(table: &AnnotatedTable) -> Self {
        let mut summary = QcSummary {
            skipped: table.skipped.clone(),
            ..Default::default()
        };

        for (key, qc) in &table.annotations {
            let valid = qc.count(QcFlag::Valid);
            let range_errors = qc.count(QcFlag::RangeError);
            let suspect = qc.count(QcFlag::Suspect);
            let observations = valid + range_errors + suspect;

            summary.observations += observations;
            summary.valid += valid;
            summary.range_errors += range_errors;
            summary.suspect += suspect;
            summary.missing_raw += qc.missing_raw();

            let stats = summary
                .station_statistics
                .entry(key.station.clone())
                .or_default();
            stats.series_evaluated += 1;
            stats.observations += observations;
            stats.valid += valid;
            stats.range_errors += range_errors;
            stats.suspect += suspect;
        }

        for (station, reference) in &table.references {
            summary
                .station_statistics
                .entry(station.clone())
                .or_default()
                .reference_days = reference.len();
        }

        summary
    }

    pub fn flagged(&self) -> usize {
        self.range_errors + self.suspect
    }

    pub fn count(&self, flag: QcFlag) -> usize {
        match flag {
            QcFlag::Valid => self.valid,
            QcFlag::RangeError => self.range_errors,
            QcFlag::Suspect => self.suspect,
        }
    }

    /// Generate a text report
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Quality Control Report ===\n");
        summary.push_str(&format!("Observations: {}\n", self.observations));
        for flag in QcFlag::ALL {
            let count = self.count(flag);
            summary.push_str(&format!(
                "{:<12} {} ({:.1}%)\n",
                format!("{}:", flag),
                count,
                percentage(count, self.observations)
            ));
        }
        summary.push_str(&format!("Empty rows: {}\n", self.missing_raw));

        if !self.station_statistics.is_empty() {
            summary.push_str("\nStations:\n");
            for (station, stats) in &self.station_statistics {
                summary.push_str(&format!(
                    "  {}: {} series, {} observations, {} flagged ({} range, {} suspect), {} reference days\n",
                    station,
                    stats.series_evaluated,
                    stats.observations,
                    stats.flagged(),
                    stats.range_errors,
                    stats.suspect,
                    stats.reference_days
                ));
            }
        }

        if !self.skipped.is_empty() {
            summary.push_str(&format!("\nSkipped Series: {}\n", self.skipped.len()));
            for skipped in &self.skipped {
                let reason = match skipped.reason {
                    SkipReason::NonNumeric => "no numeric values",
                    SkipReason::Empty => "no observations",
                };
                summary.push_str(&format!("  {}: {}\n", skipped.key, reason));
            }
        }

        summary
    }
}
