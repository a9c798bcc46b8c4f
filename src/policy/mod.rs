//! Textual GC policies.
//!
//! Column-family policies are written the way `cbt setgcpolicy` accepts
//! them, for example `maxversions=10 or (maxversions=2 and maxage=5d)`.
//! Parsing produces a validated [`GcRule`](crate::GcRule), and the rule's
//! `Display` implementation renders the same syntax.

mod duration;
mod parser;

pub use duration::{format_duration, parse_duration};
pub use parser::{parse_policy, parse_policy_with_limit};
