use crate::error::{ProcessingError, Result};
use crate::models::{AnnotatedTable, QcFlag};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// One annotated observation in long form.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRow {
    pub station_id: String,
    pub quantity: String,
    pub timestamp: NaiveDateTime,
    pub raw: Option<f64>,
    pub cleaned: Option<f64>,
    pub flag: QcFlag,
}

/// Flatten every annotated observation that has a raw value, ordered by
/// station, quantity and time.
pub fn annotated_rows(table: &AnnotatedTable) -> Vec<AnnotatedRow> {
    let mut rows = Vec::new();

    for (key, qc) in &table.annotations {
        for (row, timestamp) in table.index.iter().enumerate() {
            if qc.raw[row].is_none() {
                continue;
            }
            rows.push(AnnotatedRow {
                station_id: key.station.to_string(),
                quantity: key.quantity.to_string(),
                timestamp: *timestamp,
                raw: qc.raw[row],
                cleaned: qc.cleaned[row],
                flag: qc.flags[row],
            });
        }
    }

    rows
}

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write the annotated table in long form, one row group batch at a time.
    /// Returns the number of rows written.
    pub fn write_table(&self, table: &AnnotatedTable, path: &Path) -> Result<usize> {
        let rows = annotated_rows(table);
        self.write_rows(&rows, path)?;
        Ok(rows.len())
    }

    pub fn write_rows(&self, rows: &[AnnotatedRow], path: &Path) -> Result<()> {
        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in rows.chunks(self.row_group_size) {
            let batch = self.rows_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        Ok(())
    }

    /// Arrow schema of the long-form export
    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("station_id", DataType::Utf8, false),
            Field::new("quantity", DataType::Utf8, false),
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Second, None),
                false,
            ),
            Field::new("raw", DataType::Float64, true),
            Field::new("cleaned", DataType::Float64, true),
            Field::new("flag", DataType::Utf8, false),
        ];

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(&self, rows: &[AnnotatedRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let station_ids: Vec<&str> = rows.iter().map(|r| r.station_id.as_str()).collect();
        let quantities: Vec<&str> = rows.iter().map(|r| r.quantity.as_str()).collect();
        let timestamps: Vec<i64> = rows
            .iter()
            .map(|r| r.timestamp.and_utc().timestamp())
            .collect();
        let raw: Vec<Option<f64>> = rows.iter().map(|r| r.raw).collect();
        let cleaned: Vec<Option<f64>> = rows.iter().map(|r| r.cleaned).collect();
        let flags: Vec<&str> = rows.iter().map(|r| r.flag.as_str()).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(station_ids)) as ArrayRef,
                Arc::new(StringArray::from(quantities)),
                Arc::new(TimestampSecondArray::from(timestamps)),
                Arc::new(Float64Array::from(raw)),
                Arc::new(Float64Array::from(cleaned)),
                Arc::new(StringArray::from(flags)),
            ],
        )?;

        Ok(batch)
    }

    /// Read back up to `limit` rows of a long-form export
    pub fn read_rows(&self, path: &Path, limit: usize) -> Result<Vec<AnnotatedRow>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut rows = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let station_ids = column_as::<StringArray>(&batch, 0, "station_id")?;
            let quantities = column_as::<StringArray>(&batch, 1, "quantity")?;
            let timestamps = column_as::<TimestampSecondArray>(&batch, 2, "timestamp")?;
            let raw = column_as::<Float64Array>(&batch, 3, "raw")?;
            let cleaned = column_as::<Float64Array>(&batch, 4, "cleaned")?;
            let flags = column_as::<StringArray>(&batch, 5, "flag")?;

            for i in 0..batch.num_rows() {
                if rows.len() >= limit {
                    return Ok(rows);
                }

                let timestamp = DateTime::from_timestamp(timestamps.value(i), 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat("Invalid timestamp in Parquet file".into())
                    })?;

                rows.push(AnnotatedRow {
                    station_id: station_ids.value(i).to_string(),
                    quantity: quantities.value(i).to_string(),
                    timestamp,
                    raw: (!raw.is_null(i)).then(|| raw.value(i)),
                    cleaned: (!cleaned.is_null(i)).then(|| cleaned.value(i)),
                    flag: flags.value(i).parse()?,
                });
            }
        }

        Ok(rows)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            file_size,
            compression: self.compression,
        })
    }
}

fn column_as<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QcSeries, SeriesKey};
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn sample_table() -> AnnotatedTable {
        let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut qc = QcSeries::capture(&[Some(70.0), None, Some(150.0)]);
        qc.reject(2, QcFlag::RangeError);

        let mut table = AnnotatedTable {
            index: (0..3)
                .map(|d| (day + chrono::Duration::days(d)).and_hms_opt(0, 0, 0).unwrap())
                .collect(),
            ..Default::default()
        };
        table
            .annotations
            .insert(SeriesKey::new("1050:CO:SNTL", "TMAX"), qc);
        table
    }

    #[test]
    fn test_annotated_rows_skip_missing_raw() {
        let rows = annotated_rows(&sample_table());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].flag, QcFlag::RangeError);
        assert_eq!(rows[1].raw, Some(150.0));
        assert_eq!(rows[1].cleaned, None);
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        let written = writer.write_table(&sample_table(), temp_file.path())?;
        assert_eq!(written, 2);

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 2);

        let rows = writer.read_rows(temp_file.path(), 10)?;
        assert_eq!(rows, annotated_rows(&sample_table()));
        Ok(())
    }

    #[test]
    fn test_row_group_size_splits_row_groups() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(1);
        let temp_file = NamedTempFile::new()?;

        writer.write_table(&sample_table(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 2);
        assert_eq!(info.row_groups, 2);
        Ok(())
    }

    #[test]
    fn test_write_empty_table() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        let written = writer.write_table(&AnnotatedTable::default(), temp_file.path())?;
        assert_eq!(written, 0);
        assert_eq!(writer.get_file_info(temp_file.path())?.total_rows, 0);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;
            let result = writer.write_table(&sample_table(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
