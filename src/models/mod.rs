//! Data models for cellgc.
//!
//! Rule trees and the per-cell metadata they are evaluated against.

mod cell;
mod rule;

pub use cell::CellMetadata;
pub use rule::GcRule;
