//! Report rendering.

pub mod generator;

pub use generator::{
    generate_json, generate_markdown_dashboard, generate_markdown_events,
    generate_markdown_reminders,
};
