/// Installs the `tracing` subscriber with console and rolling file output.
pub mod tracing_setup;

pub use tracing_setup::{cleanup_old_logs, setup_logging, LoggerError};
