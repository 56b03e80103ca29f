//! Analysis modules.
//!
//! Period filtering, bucket aggregation and the dashboard built on them.

pub mod aggregator;
pub mod dashboard;
pub mod window;

pub use aggregator::*;
pub use dashboard::{Dashboard, DashboardOptions};
pub use window::{filter_period, filter_range, Period};
