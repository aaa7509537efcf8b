/// Element codes of the temperature quantities
pub const TEMP_TYPE_MAX: &str = "TMAX";
pub const TEMP_TYPE_MIN: &str = "TMIN";
pub const TEMP_TYPE_AVG: &str = "TAVG";
pub const DEFAULT_REFERENCE_QUANTITY: &str = "TOBS";

/// QC thresholds (degrees Fahrenheit)
pub const DEFAULT_LOW_THRESHOLD: f64 = -50.0;
pub const DEFAULT_HIGH_THRESHOLD: f64 = 130.0;
pub const DEFAULT_MARGIN: f64 = 5.0;

/// Configuration
pub const CONFIG_ENV_PREFIX: &str = "STATION_QC";
pub const CONFIG_ENV_SEPARATOR: &str = "__";

/// Export column naming
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const RAW_SUFFIX: &str = "_raw";
pub const FLAG_SUFFIX: &str = "_flag";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
