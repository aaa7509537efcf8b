pub mod parallel_processor;
pub mod qc_evaluator;
pub mod qc_summary;
pub mod reference_aggregator;
pub mod rules;

pub use parallel_processor::ParallelProcessor;
pub use qc_evaluator::QcEvaluator;
pub use qc_summary::{QcSummary, StationSummary};
pub use reference_aggregator::ReferenceAggregator;
pub use rules::{first_violation, rules_for, QcRule};
