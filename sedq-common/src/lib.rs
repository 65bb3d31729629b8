//! # Sedq Common Library
//!
//! Shared code for the Sedq image-forensics services:
//! - Error type shared across crates
//! - Configuration file resolution and TOML loading
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
