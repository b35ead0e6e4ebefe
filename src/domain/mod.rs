// Domain module - Core types shared across the crate
pub mod config;
pub mod endpoint;
pub mod error;
