pub mod config;
pub mod result;
pub mod stage;

pub use config::*;
pub use result::*;
pub use stage::*;
