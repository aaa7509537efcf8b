pub mod annotation;
pub mod observation;
pub mod reference;
pub mod station;

pub use annotation::{AnnotatedTable, QcFlag, QcSeries, SkipReason, SkippedColumn};
pub use observation::{ObservationTable, ObservationTableBuilder, Series};
pub use reference::{DailyReference, ReferenceSeries};
pub use station::{QuantityCode, SamplingDuration, SeriesKey, StationId};
