// src/time/mod.rs

//! Calendar granularities and the time ranges built from them.
//!
//! - [`granularity`] holds the ordered unit enum with shifting, counting,
//!   token parsing/formatting and subdivision of a master range.
//! - [`range`] holds the immutable [`TimeRange`] value.

pub mod granularity;
pub mod range;

pub use granularity::{Granularity, PARSE_PRECEDENCE};
pub use range::TimeRange;
