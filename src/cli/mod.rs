// CLI module - Console presentation of transport events
pub mod report;

pub use report::{ConsoleReporter, OutputFormat};
