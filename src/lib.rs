pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod services;

pub use error::*;
pub use models::*;

#[cfg(test)]
mod integration_tests;
