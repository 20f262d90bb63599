pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod results;
pub mod target;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiloadError, ExtractError};
