//! wpdocs-core: Shared symbol types, errors and configuration for wpdocs.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
