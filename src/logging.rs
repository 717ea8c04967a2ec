//! tracing setup
//!
//! `RUST_LOG` picks the level (default `info`). Output goes to stderr unless
//! a log file is given, which keeps diagnostics out of the redrawn table.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true);

    let init_result = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // Only fails when a global subscriber is already installed; keep that one.
    if let Err(e) = init_result {
        tracing::debug!("[LOGGING] Keeping existing subscriber: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lytter.log");

        assert!(init_logging(Some(path.as_path())).is_ok());
        assert!(init_logging(None).is_ok());
        assert!(init_logging(Some(path.as_path())).is_ok());
    }
}
