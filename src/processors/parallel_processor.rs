use crate::error::{ProcessingError, Result};
use crate::models::{AnnotatedTable, ObservationTable, StationId};
use crate::processors::QcEvaluator;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Fans QC evaluation out over disjoint groups of stations on a bounded
/// rayon pool and merges the results.
pub struct ParallelProcessor {
    max_workers: usize,
    chunk_size: usize,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            chunk_size: 8,
        }
    }

    /// Number of stations evaluated together as one unit of work.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn evaluate(
        &self,
        evaluator: &QcEvaluator,
        table: &ObservationTable,
        progress: Option<&ProgressReporter>,
    ) -> Result<AnnotatedTable> {
        let stations: Vec<StationId> = table.stations().into_iter().collect();
        let total_chunks = stations.len().div_ceil(self.chunk_size);
        let processed_chunks = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_message(&format!("Evaluating {} stations...", stations.len()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let parts: Vec<AnnotatedTable> = pool.install(|| {
            stations
                .par_chunks(self.chunk_size)
                .map(|chunk| {
                    let subset = table.select_stations(chunk);
                    let result = evaluator.evaluate(&subset);

                    let count = processed_chunks.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.set_message(&format!("Evaluated {}/{} station groups", count, total_chunks));
                    }

                    result
                })
                .collect()
        });

        debug!(
            "Merging {} station groups evaluated on {} workers",
            parts.len(),
            self.max_workers
        );

        let mut merged = AnnotatedTable {
            index: table.index().to_vec(),
            ..Default::default()
        };
        for part in parts {
            merged.absorb(part);
        }

        Ok(merged)
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesKey;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_station_fan_out_matches_single_pass() {
        let mut builder = ObservationTable::builder();
        for (i, station) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            for day in 1..=3 {
                let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
                for hour in [3, 9, 15] {
                    builder.push(
                        SeriesKey::new(*station, "TOBS"),
                        date.and_hms_opt(hour, 0, 0).unwrap(),
                        Some(20.0 + hour as f64 + i as f64),
                    );
                }
                builder.push(
                    SeriesKey::new(*station, "TMAX"),
                    date.and_hms_opt(0, 0, 0).unwrap(),
                    Some(30.0 + 10.0 * day as f64),
                );
            }
        }
        builder.push(
            SeriesKey::new("C", "TMIN"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            Some(-80.0),
        );
        let table = builder.build();

        let evaluator = QcEvaluator::default();
        let single = evaluator.evaluate(&table);
        let fanned = ParallelProcessor::new(3)
            .with_chunk_size(2)
            .evaluate(&evaluator, &table, None)
            .unwrap();

        assert_eq!(fanned, single);
    }

    #[test]
    fn test_empty_table() {
        let result = ParallelProcessor::new(2)
            .evaluate(&QcEvaluator::default(), &ObservationTable::default(), None)
            .unwrap();
        assert!(result.is_empty());
    }
}
