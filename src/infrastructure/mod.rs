// Infrastructure module - Logging and configuration adapters
pub mod config;
pub mod logging;
