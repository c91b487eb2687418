/// Log tags, one per pipeline area
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    MarketData,
    Liquidity,
    Universe,
    Risk,
    Aggregate,
    Wrangle,
    Export,
    Binance,
    Notebooks,
    Cache,
    Api,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug <key>`
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::MarketData => "market-data".to_string(),
            LogTag::Liquidity => "liquidity".to_string(),
            LogTag::Universe => "universe".to_string(),
            LogTag::Risk => "risk".to_string(),
            LogTag::Aggregate => "aggregate".to_string(),
            LogTag::Wrangle => "wrangle".to_string(),
            LogTag::Export => "export".to_string(),
            LogTag::Binance => "binance".to_string(),
            LogTag::Notebooks => "notebooks".to_string(),
            LogTag::Cache => "cache".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::MarketData => "MARKET".to_string(),
            LogTag::Liquidity => "LIQUIDITY".to_string(),
            LogTag::Universe => "UNIVERSE".to_string(),
            LogTag::Risk => "RISK".to_string(),
            LogTag::Aggregate => "AGGREGATE".to_string(),
            LogTag::Wrangle => "WRANGLE".to_string(),
            LogTag::Export => "EXPORT".to_string(),
            LogTag::Binance => "BINANCE".to_string(),
            LogTag::Notebooks => "NOTEBOOKS".to_string(),
            LogTag::Cache => "CACHE".to_string(),
            LogTag::Api => "API".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
