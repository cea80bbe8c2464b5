//! Core types for the report consolidator.
//!
//! Holds the canonical [`models::Report`] record, the fixed-zone
//! [`time_utils::TimeCodec`], the shared error type and the command-line
//! settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ReportError, Result};
