pub mod aggregate;
pub mod apis;
pub mod arguments;
pub mod config; // config_struct! sections, TOML loading
pub mod errors; // Structured error handling
pub mod export;
pub mod liquidity;
pub mod logger;
pub mod market;
pub mod notebooks;
pub mod paths;
pub mod pipeline;
pub mod risk;
pub mod timeseries;
pub mod utils;
