use crate::analyzers::ComparisonPair;
use crate::error::Result;
use crate::models::{AnnotatedTable, QcSeries, QuantityCode, Series, StationId};
use crate::utils::constants::{FLAG_SUFFIX, RAW_SUFFIX, TIMESTAMP_COLUMN, TIMESTAMP_FORMAT};
use crate::utils::station_csv_path;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Export column group for one quantity of a station
enum ExportColumn<'a> {
    Annotated(&'a QuantityCode, &'a QcSeries),
    Passthrough(&'a QuantityCode, &'a Series),
}

impl ExportColumn<'_> {
    fn quantity(&self) -> &QuantityCode {
        match self {
            ExportColumn::Annotated(q, _) | ExportColumn::Passthrough(q, _) => *q,
        }
    }

    fn headers(&self, out: &mut Vec<String>) {
        match self {
            ExportColumn::Annotated(q, _) => {
                out.push(format!("{}{}", q, RAW_SUFFIX));
                out.push(q.to_string());
                out.push(format!("{}{}", q, FLAG_SUFFIX));
            }
            ExportColumn::Passthrough(q, _) => out.push(q.to_string()),
        }
    }

    fn has_value(&self, row: usize) -> bool {
        match self {
            ExportColumn::Annotated(_, qc) => qc.raw[row].is_some(),
            ExportColumn::Passthrough(_, series) => series.get(row).is_some(),
        }
    }

    fn cells(&self, row: usize, out: &mut Vec<String>) {
        match self {
            ExportColumn::Annotated(_, qc) => {
                out.push(format_value(qc.raw[row]));
                out.push(format_value(qc.cleaned[row]));
                out.push(qc.flags[row].to_string());
            }
            ExportColumn::Passthrough(_, series) => out.push(format_value(series.get(row))),
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes annotated tables as per-station wide CSV files.
pub struct CsvWriter {
    timestamp_format: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
        }
    }

    fn station_columns<'a>(
        table: &'a AnnotatedTable,
        station: &StationId,
    ) -> Vec<ExportColumn<'a>> {
        let mut columns: Vec<ExportColumn<'a>> = table
            .annotations
            .iter()
            .filter(|(key, _)| &key.station == station)
            .map(|(key, qc)| ExportColumn::Annotated(&key.quantity, qc))
            .chain(
                table
                    .passthrough
                    .iter()
                    .filter(|(key, _)| &key.station == station)
                    .map(|(key, series)| ExportColumn::Passthrough(&key.quantity, series)),
            )
            .collect();

        columns.sort_by(|a, b| a.quantity().cmp(b.quantity()));
        columns
    }

    /// Header of a station's export, in quantity order.
    pub fn station_header(&self, table: &AnnotatedTable, station: &StationId) -> Vec<String> {
        let mut header = vec![TIMESTAMP_COLUMN.to_string()];
        for column in Self::station_columns(table, station) {
            column.headers(&mut header);
        }
        header
    }

    /// Write one station's series to `path`. Rows where all of the station's
    /// values are missing are left out. Returns the number of data rows.
    pub fn write_station(
        &self,
        table: &AnnotatedTable,
        station: &StationId,
        path: &Path,
    ) -> Result<usize> {
        let file = File::create(path)?;
        self.write_station_to(table, station, file)
    }

    pub fn write_station_to<W: Write>(
        &self,
        table: &AnnotatedTable,
        station: &StationId,
        writer: W,
    ) -> Result<usize> {
        let columns = Self::station_columns(table, station);
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(self.station_header(table, station))?;

        let mut rows = 0;
        for (row, timestamp) in table.index.iter().enumerate() {
            if !columns.iter().any(|c| c.has_value(row)) {
                continue;
            }

            let mut record = vec![timestamp.format(&self.timestamp_format).to_string()];
            for column in &columns {
                column.cells(row, &mut record);
            }
            csv_writer.write_record(&record)?;
            rows += 1;
        }

        csv_writer.flush()?;
        debug!("Wrote {} rows for station {}", rows, station);
        Ok(rows)
    }

    /// One file per station inside `dir`, in station order.
    pub fn write_all(&self, table: &AnnotatedTable, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut paths = Vec::new();
        for station in table.stations() {
            let path = station_csv_path(dir, &station);
            self.write_station(table, &station, &path)?;
            paths.push(path);
        }

        Ok(paths)
    }

    /// Export one raw-vs-cleaned pairing as `timestamp,raw,cleaned,flag`.
    pub fn write_comparison(&self, pair: &ComparisonPair<'_>, path: &Path) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_path(path)?;
        csv_writer.write_record([TIMESTAMP_COLUMN, "raw", "cleaned", "flag"])?;

        let mut rows = 0;
        for point in pair.points() {
            csv_writer.write_record([
                point.timestamp.format(&self.timestamp_format).to_string(),
                point.raw.to_string(),
                format_value(point.cleaned),
                point.flag.to_string(),
            ])?;
            rows += 1;
        }

        csv_writer.flush()?;
        Ok(rows)
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
