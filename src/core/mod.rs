//! Core utilities and common types for dbward.

pub mod config;
pub mod error;
pub mod types;

pub use config::CoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use types::*;
