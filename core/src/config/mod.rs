mod load;
mod types;

pub use load::{
    apply_env_overrides, load_for_package, parse_str, CONFIG_FILE_NAME, ENV_LOG_LEVEL,
    ENV_MAX_PARALLEL,
};
pub use types::*;
