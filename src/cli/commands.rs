use crate::analyzers::ComparisonReporter;
use crate::cli::args::{Cli, Commands};
use crate::config::{load_settings, QcConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{AnnotatedTable, SeriesKey};
use crate::processors::{ParallelProcessor, QcEvaluator, QcSummary};
use crate::readers::ConcurrentReader;
use crate::utils::progress::ProgressReporter;
use crate::utils::{annotated_parquet_path, generate_default_output_dir, init_logging};
use crate::writers::{CsvWriter, ParquetWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            inputs,
            config,
            output_dir,
            parquet,
            compression,
            row_group_size,
            station,
            max_workers,
            chunk_size,
            validate_only,
        } => {
            let qc_config = load_config(config.as_deref())?;
            let output_dir = output_dir.unwrap_or_else(generate_default_output_dir);

            println!("Running quality control...");
            println!("Inputs: {}", display_paths(&inputs));
            println!("Workers: {}, Chunk size: {}", max_workers, chunk_size);

            let progress = ProgressReporter::new_spinner("Reading observations...", false);

            let table = ConcurrentReader::new(max_workers)
                .with_station_filter(station)
                .read_all(&inputs)
                .await?;

            if table.is_empty() {
                progress.finish_with_message("No observations found");
                return Ok(());
            }

            let evaluator = QcEvaluator::new(qc_config);
            let annotated = ParallelProcessor::new(max_workers)
                .with_chunk_size(chunk_size)
                .evaluate(&evaluator, &table, Some(&progress))?;

            progress.finish_with_message(&format!(
                "Evaluated {} series over {} timestamps",
                annotated.annotations.len(),
                annotated.num_rows()
            ));

            println!("\n{}", QcSummary::from_table(&annotated).generate_summary());

            if validate_only {
                println!("Validation complete - no output files written");
                return Ok(());
            }

            write_outputs(
                &annotated,
                &output_dir,
                parquet.then_some((compression.as_str(), row_group_size)),
            )?;
            println!("Processing complete!");
        }

        Commands::Validate { config } => {
            let settings = load_settings(config.as_deref())?;
            println!("Effective QC settings:");
            println!("{}", serde_json::to_string_pretty(&settings)?);

            match settings.into_config() {
                Ok(_) => println!("✅ Configuration is valid"),
                Err(e) => {
                    println!("❌ Configuration is invalid: {}", e);
                    return Err(e);
                }
            }
        }

        Commands::Report {
            inputs,
            config,
            station,
            quantity,
            comparison_csv,
        } => {
            let qc_config = load_config(config.as_deref())?;

            let table = ConcurrentReader::default()
                .with_station_filter(station.clone())
                .read_all(&inputs)
                .await?;
            let annotated = QcEvaluator::new(qc_config).evaluate(&table);
            let reporter = ComparisonReporter::new(&annotated);

            println!("{}", reporter.generate_summary());

            if let (Some(station), Some(quantity)) = (station, quantity) {
                let key = SeriesKey::new(station, &quantity);
                let pair = reporter.pair(&key).ok_or_else(|| {
                    ProcessingError::MissingData(format!("No evaluated series {}", key))
                })?;

                let counts = pair.flag_counts();
                println!(
                    "{}: {} observations, {} valid, {} range errors, {} suspect",
                    key,
                    counts.total(),
                    counts.valid,
                    counts.range_errors,
                    counts.suspect
                );

                if let Some(path) = comparison_csv {
                    let rows = CsvWriter::new().write_comparison(&pair, &path)?;
                    println!("Wrote {} rows to {}", rows, path.display());
                }
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;

            println!("\nFile Details:");
            println!("{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match writer.read_rows(&file, sample) {
                    Ok(rows) => {
                        for (i, row) in rows.iter().enumerate() {
                            println!(
                                "{}. {} {} at {}: raw={} cleaned={} ({})",
                                i + 1,
                                row.station_id,
                                row.quantity,
                                row.timestamp,
                                format_optional(row.raw),
                                format_optional(row.cleaned),
                                row.flag
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<QcConfig> {
    let config = load_settings(path)?.into_config()?;
    info!(
        "QC bounds [{}, {}], margin {}, reference {}",
        config.bounds.low, config.bounds.high, config.margin, config.reference_quantity
    );
    Ok(config)
}

/// `parquet` carries the compression name and row group size when a
/// Parquet export is wanted.
fn write_outputs(
    annotated: &AnnotatedTable,
    output_dir: &Path,
    parquet: Option<(&str, usize)>,
) -> Result<()> {
    let paths = CsvWriter::new().write_all(annotated, output_dir)?;
    println!(
        "Wrote {} station files to {}",
        paths.len(),
        output_dir.display()
    );

    if let Some((compression, row_group_size)) = parquet {
        let writer = ParquetWriter::new()
            .with_compression(compression)?
            .with_row_group_size(row_group_size);
        let path = annotated_parquet_path(output_dir);
        let rows = writer.write_table(annotated, &path)?;
        println!("Wrote {} annotated rows to {}", rows, path.display());
        println!("\n{}", writer.get_file_info(&path)?.summary());
    }

    Ok(())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}
