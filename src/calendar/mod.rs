//! Calendar modules.
//!
//! Event templates are stored once; everything else works on the
//! instances derived from them for a bounded window.

pub mod recurrence;

pub use recurrence::{expand_all, upcoming};
