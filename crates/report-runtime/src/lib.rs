//! Runtime layer for the report consolidator.
//!
//! Drives the parse → filter → sort → aggregate → export → summarize
//! pipeline over the configured inputs.

pub mod orchestrator;

pub use report_core as core;
pub use report_data as data;
