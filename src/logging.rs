//! Logger setup for embedding applications

use std::fs::File;
use std::path::Path;

use simplelog::{Config, LevelFilter, WriteLogger};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("logger already installed: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Route all `log` output to `path`, truncating it.
///
/// The viewer never writes to stdout/stderr itself, so hosts that own the
/// terminal or a window should log to a file.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> Result<(), LoggingError> {
    WriteLogger::init(level, Config::default(), File::create(path)?)?;
    log::info!("docview {} logging to {path:?}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
