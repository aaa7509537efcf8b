use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{
    DailyReference, ObservationTable, QuantityCode, ReferenceSeries, SeriesKey, StationId,
};

/// Builds per-station daily max/min/mean of the reference quantity.
pub struct ReferenceAggregator {
    reference_quantity: QuantityCode,
}

impl ReferenceAggregator {
    pub fn new(reference_quantity: QuantityCode) -> Self {
        Self { reference_quantity }
    }

    /// Aggregate every station that has a reference column. Stations
    /// without one are simply absent from the result.
    pub fn aggregate(&self, table: &ObservationTable) -> BTreeMap<StationId, ReferenceSeries> {
        let references: BTreeMap<StationId, ReferenceSeries> = table
            .stations()
            .into_iter()
            .filter_map(|station| {
                self.aggregate_station(table, &station)
                    .map(|series| (station, series))
            })
            .collect();

        debug!(
            "Aggregated {} reference into {} station series",
            self.reference_quantity,
            references.len()
        );

        references
    }

    pub fn aggregate_station(
        &self,
        table: &ObservationTable,
        station: &StationId,
    ) -> Option<ReferenceSeries> {
        let key = SeriesKey {
            station: station.clone(),
            quantity: self.reference_quantity.clone(),
        };
        let series = table.column(&key)?;

        // Group non-missing observations by calendar day
        let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (timestamp, value) in table.index().iter().zip(&series.values) {
            if let Some(value) = value {
                by_day.entry(timestamp.date()).or_default().push(*value);
            }
        }

        let daily = by_day
            .into_iter()
            .filter_map(|(day, values)| DailyReference::from_values(&values).map(|r| (day, r)))
            .collect();

        Some(ReferenceSeries { daily })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    #[test]
    fn test_daily_aggregates() {
        let tobs = SeriesKey::new("1:CO:SNTL", "TOBS");
        let mut builder = ObservationTable::builder();
        builder.push(tobs.clone(), ts(1, 0), Some(50.0));
        builder.push(tobs.clone(), ts(1, 6), Some(45.0));
        builder.push(tobs.clone(), ts(1, 12), Some(70.0));
        builder.push(tobs.clone(), ts(1, 18), None);
        builder.push(tobs.clone(), ts(2, 12), Some(80.0));
        let table = builder.build();

        let aggregator = ReferenceAggregator::new(QuantityCode::new("TOBS"));
        let references = aggregator.aggregate(&table);
        let series = &references[&StationId::new("1:CO:SNTL")];

        let day1 = series.get(date(1)).unwrap();
        assert_eq!(day1.max, 70.0);
        assert_eq!(day1.min, 45.0);
        assert!((day1.mean - 55.0).abs() < 1e-9);
        assert_eq!(day1.count, 3);

        let day2 = series.get(date(2)).unwrap();
        assert_eq!(day2.count, 1);
        assert_eq!(day2.mean, 80.0);
    }

    #[test]
    fn test_days_without_observations_are_absent() {
        let tobs = SeriesKey::new("1:CO:SNTL", "TOBS");
        let tmax = SeriesKey::new("1:CO:SNTL", "TMAX");
        let mut builder = ObservationTable::builder();
        builder.push(tobs.clone(), ts(1, 3), Some(40.0));
        builder.push(tobs.clone(), ts(2, 3), None);
        builder.push(tmax.clone(), ts(3, 0), Some(60.0));
        let table = builder.build();

        let aggregator = ReferenceAggregator::new(QuantityCode::new("TOBS"));
        let series = aggregator
            .aggregate_station(&table, &StationId::new("1:CO:SNTL"))
            .unwrap();

        assert_eq!(series.len(), 1);
        assert!(series.get(date(2)).is_none());
        assert!(series.get(date(3)).is_none());
    }

    #[test]
    fn test_station_without_reference_has_no_entry() {
        let mut builder = ObservationTable::builder();
        builder.push(SeriesKey::new("A", "TOBS"), ts(1, 1), Some(40.0));
        builder.push(SeriesKey::new("B", "TMAX"), ts(1, 0), Some(60.0));
        let table = builder.build();

        let references = ReferenceAggregator::new(QuantityCode::new("TOBS")).aggregate(&table);
        assert_eq!(references.len(), 1);
        assert!(references.contains_key(&StationId::new("A")));
        assert!(!references.contains_key(&StationId::new("B")));
    }
}
