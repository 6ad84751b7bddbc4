//! maestro core: stage graph scheduling, process execution, run coordination
//! and reporting. The CLI and tool selection live in sibling crates.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod report;
pub mod runner;
pub mod util;
