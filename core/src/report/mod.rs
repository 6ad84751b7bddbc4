//! Final run reporting: machine summary, JSON report and human text.

mod format;
mod summary;

pub use format::{build_report, format_duration, format_json, format_text};
pub use summary::{build_summary, RunSummary};
