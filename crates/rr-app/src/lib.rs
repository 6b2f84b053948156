//! Command-line driver for a rank/log-ratio exploration session

pub mod config;
pub mod demo;
pub mod driver;

pub use config::AppConfig;
pub use driver::{Command, CommandOutcome, Driver, Line, RunSummary};
