//! Configuration system
//!
//! - `macros`: the `config_struct!` macro
//! - `schemas`: every configuration section with its defaults
//! - `utils`: TOML loading and validation

mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{load_config_from_path, parse_config, parse_date_to_unix, CONFIG_FILE_PATH};
