//! Input configuration

pub mod input_config;
pub mod null_handling;

pub use input_config::*;
pub use null_handling::*;
