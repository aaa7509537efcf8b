use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily summary of the reference quantity for one station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReference {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    /// Number of reference observations that contributed
    pub count: usize,
}

impl DailyReference {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Some(Self {
            max,
            min,
            mean,
            count: values.len(),
        })
    }
}

/// Daily reference aggregates of one station. Days without any reference
/// observation are absent rather than zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceSeries {
    pub daily: BTreeMap<NaiveDate, DailyReference>,
}

impl ReferenceSeries {
    pub fn get(&self, date: NaiveDate) -> Option<&DailyReference> {
        self.daily.get(&date)
    }

    pub fn len(&self) -> usize {
        self.daily.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    /// Re-index onto a full timestamp index: each row receives the aggregate
    /// of its own calendar day, carried forward across that day's rows.
    pub fn align(&self, index: &[NaiveDateTime]) -> Vec<Option<DailyReference>> {
        let mut aligned = Vec::with_capacity(index.len());
        let mut carried: Option<(NaiveDate, Option<DailyReference>)> = None;

        for timestamp in index {
            let day = timestamp.date();
            let value = match carried {
                Some((carried_day, value)) if carried_day == day => value,
                _ => {
                    let value = self.daily.get(&day).copied();
                    carried = Some((day, value));
                    value
                }
            };
            aligned.push(value);
        }

        aligned
    }
}
