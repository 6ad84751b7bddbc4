//! Pluggable pieces around the maestro core: which command each built-in
//! tool runs, how live events are rendered, how long to back off between
//! attempts, and the `pyproject.toml` editors.

pub mod executor;
pub mod factory;
pub mod pyproject;
pub mod toolchain;
