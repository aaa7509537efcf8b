use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output for
/// this crate. With a log file, events go to the file instead of stderr.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_directive = if verbose {
        "station_qc=debug"
    } else {
        "station_qc=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // A second initialisation (e.g. from tests) is not an error worth failing on
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }

    Ok(())
}
