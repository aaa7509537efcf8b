use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-qc")]
#[command(about = "Quality control for multi-station temperature observations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run quality control over observation files and export the annotated data
    Process {
        #[arg(
            required = true,
            help = "Input .csv/.json files or directories containing them"
        )]
        inputs: Vec<PathBuf>,

        #[arg(short, long, help = "QC settings file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output directory [default: output/station-qc-{YYMMDD}]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Also write a long-format Parquet file")]
        parquet: bool,

        #[arg(long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value = "10000", help = "Rows per Parquet row group")]
        row_group_size: usize,

        #[arg(short, long, help = "Only process this station")]
        station: Option<String>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, default_value = "8", help = "Stations evaluated per work unit")]
        chunk_size: usize,

        #[arg(long, default_value = "false")]
        validate_only: bool,
    },

    /// Check a QC settings file and print the effective configuration
    Validate {
        #[arg(short, long, help = "QC settings file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,
    },

    /// Print raw-vs-cleaned comparison statistics, optionally exporting one series
    Report {
        #[arg(required = true, help = "Input .csv/.json files or directories")]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        station: Option<String>,

        #[arg(short, long, requires = "station", help = "Quantity to export, e.g. TMAX")]
        quantity: Option<String>,

        #[arg(
            long,
            requires = "quantity",
            help = "Write the selected series as timestamp,raw,cleaned,flag"
        )]
        comparison_csv: Option<PathBuf>,
    },

    /// Display information about an annotated Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
