pub mod comparison_reporter;

pub use comparison_reporter::{ComparisonPair, ComparisonPoint, ComparisonReporter, FlagCounts};
