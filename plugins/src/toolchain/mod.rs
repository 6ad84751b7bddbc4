//! Built-in Python toolchain: package layout, tool command templates, the
//! default stage graph and stage resolution.

pub mod defaults;
pub mod layout;
pub mod overrides;
pub mod resolve;
pub mod tools;

pub use defaults::{default_stages, ALL_GROUP, CHECK_STAGES};
pub use layout::{expand_package_dir, PackageLayout};
pub use overrides::{parse_assignment, StageOverrides};
pub use resolve::{missing_programs, Toolchain};
pub use tools::tool_template;
