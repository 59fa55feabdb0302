//! Report rendering.

pub mod generator;

pub use generator::{generate_json_report, render, render_at};
