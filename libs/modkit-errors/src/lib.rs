//! Core error types shared by the modkit criteria crates
//!
//! Pure data, no HTTP framework dependencies:
//! - RFC 9457 Problem Details (`Problem`, `ValidationViolation`)
//! - Static error catalog entries (`ErrDef`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::{Problem, ValidationViolation};
