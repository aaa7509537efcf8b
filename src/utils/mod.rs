pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod timestamps;

pub use constants::*;
pub use filename::{annotated_parquet_path, generate_default_output_dir, station_csv_path};
pub use logging::init_logging;
pub use progress::ProgressReporter;
pub use timestamps::{normalize, parse_timestamp, parse_timestamp_as};
