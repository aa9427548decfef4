//! # Recall Common Library
//!
//! Shared code for the recall services:
//! - Error and result types
//! - Bootstrap configuration file resolution and loading
//! - Fixed-offset local day arithmetic and timestamp encoding
//! - SQLite schema initialization
//! - Broadcast event bus

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
