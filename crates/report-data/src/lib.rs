//! Data layer for the report consolidator.
//!
//! Parses the tabular, markup and object-notation inputs into canonical
//! reports, counts reports per service and writes reports back out.

pub mod aggregator;
pub mod markup;
pub mod object_notation;
pub mod reader;
pub mod tabular;
pub mod writer;

pub use report_core as core;
