/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use crate::config_struct;
use crate::export::{CsvLayout, ParquetCodec};
use crate::liquidity::{DedupKey, RankingMetric};
use crate::market::TimeBucket;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// MARKET DATA
// ============================================================================

config_struct! {
    /// Trading Strategy dataset server
    pub struct MarketDataConfig {
        api_url: String = "https://tradingstrategy.ai/api".to_string(),
        /// Environment variable holding the optional API key
        api_key_env: String = "TRADING_STRATEGY_API_KEY".to_string(),
        /// Dataset cache directory, empty means `<cache>/datasets`
        cache_dir: String = String::new(),
        /// Re-download a cached dataset once it is older than this
        cache_max_age_hours: u64 = 24,
        request_timeout_secs: u64 = 600,
    }
}

// ============================================================================
// UNIVERSE SELECTION
// ============================================================================

config_struct! {
    /// Which pairs are candidates and how they are ranked
    pub struct UniverseConfig {
        chain_id: u64 = 1,
        exchange_slugs: Vec<String> = strings(&["uniswap-v2", "uniswap-v3", "sushi"]),

        // Data frequency
        time_bucket: TimeBucket = TimeBucket::D1,
        /// TVL of Uniswap v3 is only sampled daily, finer is pointless
        liquidity_time_bucket: TimeBucket = TimeBucket::D1,

        // Pair prefilter
        allowed_quote_tokens: Vec<String> = strings(&["WETH", "USDC", "USDT", "DAI"]),
        stablecoins: Vec<String> = strings(&[
            "USDC", "USDT", "DAI", "BUSD", "FRAX", "TUSD", "USDP", "LUSD", "GUSD", "SUSD",
            "EURS", "EURT", "PYUSD", "CRVUSD",
        ]),
        untradeable_base_tokens: Vec<String> = strings(&["OHM", "SOHM", "GOHM", "AMPL"]),

        // Liquidity ranking
        min_liquidity_usd: f64 = 4_000_000.0,
        max_pairs: usize = 100,
        ranking_metric: RankingMetric = RankingMetric::HistoricalMax,
        dedup_key: DedupKey = DedupKey::BaseAddress,
        /// How many top samples the realistic max is taken over
        liquidity_samples: usize = 10,
        /// Realistic max above this is treated as broken data
        broken_liquidity_ceiling_usd: f64 = 100_000_000.0,
        /// Indexers lag behind, "today" is sampled this far back
        today_lag_days: i64 = 21,
        /// Lag of the comparison date used by `at_date` ranking
        comparison_lag_days: i64 = 7,

        /// Exchange slug that must appear among the selected pairs
        #[serde(skip_serializing_if = "Option::is_none")]
        require_exchange: Option<String> = None,

        // Candle date range, `YYYY-MM-DD`, open ended when unset
        #[serde(skip_serializing_if = "Option::is_none")]
        start_date: Option<String> = None,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_date: Option<String> = None,
    }
}

// ============================================================================
// RISK GATE
// ============================================================================

config_struct! {
    /// TokenSniffer based risk gate
    pub struct RiskConfig {
        enabled: bool = true,
        /// Missing API key is fatal when set, otherwise the gate is skipped
        required: bool = false,
        api_url: String = "https://tokensniffer.com/api/v2".to_string(),
        api_key_env: String = "TOKENSNIFFER_API_KEY".to_string(),
        /// Minimum acceptable score (0-100)
        threshold: f64 = 24.0,
        /// Cap on candidates sent to the API
        max_checked_pairs: usize = 250,
        reject_flagged: bool = true,
        /// Known-good base symbols, reported in rejection warnings only
        allow_list: Vec<String> = strings(&[
            "WETH", "WBTC", "USDC", "USDT", "DAI", "LINK", "UNI", "AAVE", "MKR", "CRV", "LDO",
            "SNX", "COMP", "MATIC", "SHIB", "PEPE", "APE", "RPL", "FXS", "BAL", "1INCH", "SUSHI",
            "YFI", "ENS", "GRT",
        ]),
        /// Trusted base tokens as `{chain_id}-{address}`. Symbols can be
        /// copied by any token, so only the address grants the bypass
        trusted_tokens: Vec<String> = strings(&[
            "1-0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", // WETH
            "1-0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", // WBTC
            "1-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", // USDC
            "1-0xdac17f958d2ee523a2206206994597c13d831ec7", // USDT
            "1-0x6b175474e89094c44da98b954eedeac495271d0f", // DAI
            "1-0x514910771af9ca656af840dff83e8264ecf986ca", // LINK
            "1-0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", // UNI
            "1-0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", // AAVE
            "1-0x9f8f72aa9304c8b593d555f12ef6589cc3a579a2", // MKR
            "1-0xd533a949740bb3306d119cc777fa900ba034cd52", // CRV
            "1-0x5a98fcbea516cf06857215779fd812ca3bef1b32", // LDO
            "1-0x95ad61b0a150d79219dcf64e1e6cc01f0b64c4ce", // SHIB
            "1-0x6982508145454ce325ddbe47a25d4ec3d2311933", // PEPE
        ]),
        /// Trusted tokens skip the lookup and the score check
        allow_list_bypass: bool = true,
        /// SQLite cache file, empty means `<cache>/tokensniffer.sqlite`
        cache_path: String = String::new(),
        /// 0 keeps cached scores forever
        cache_max_age_days: u64 = 0,
        request_timeout_secs: u64 = 120,
        min_request_interval_ms: u64 = 1000,
    }
}

// ============================================================================
// PRICE WRANGLING
// ============================================================================

config_struct! {
    /// DEX candle clean-up
    pub struct WrangleConfig {
        enabled: bool = true,
        /// Low below `close * low_tolerance` is a bad wick
        low_tolerance: f64 = 0.1,
        /// High above `close * high_tolerance` is a bad wick
        high_tolerance: f64 = 1.9,
        forward_fill: bool = true,
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

config_struct! {
    /// Output files of the export and prefilter pipelines
    pub struct OutputConfig {
        /// Output directory, empty means `<cache>/prefiltered`
        directory: String = String::new(),
        /// Base name of the exported files
        file_name: String = "uniswap-v2-v3-ethereum-top-100".to_string(),
        layout: CsvLayout = CsvLayout::Detailed,
        write_liquidity_csv: bool = false,
        parquet_compression: ParquetCodec = ParquetCodec::Zstd,
        parquet_compression_level: i32 = 15,
        /// Rows in the run summary table
        summary_rows: usize = 10,
    }
}

config_struct! {
    /// Peak-liquidity prefilter
    pub struct PrefilterConfig {
        /// Name embedded in the output file names
        name: String = "uniswap-v2-v3-ethereum".to_string(),
        /// Keep pairs whose liquidity high ever exceeded this
        min_liquidity_usd: f64 = 10_000.0,
    }
}

// ============================================================================
// BINANCE
// ============================================================================

config_struct! {
    /// Binance spot candle downloader
    pub struct BinanceConfig {
        api_url: String = "https://api.binance.com".to_string(),
        time_bucket: TimeBucket = TimeBucket::D1,
        start_date: String = "2017-01-01".to_string(),
        #[serde(skip_serializing_if = "Option::is_none")]
        end_date: Option<String> = None,
        /// Only symbols quoted in these assets, empty means all
        quote_assets: Vec<String> = Vec::new(),
        /// Per-symbol cache, empty means `<cache>/binance`
        cache_dir: String = String::new(),
        /// Combined output name, `{bucket}` is substituted
        combined_file_name: String = "binance-candles-{bucket}.parquet".to_string(),
        download_concurrency: usize = 1,
        request_timeout_secs: u64 = 30,
        min_request_interval_ms: u64 = 250,
    }
}

// ============================================================================
// NOTEBOOKS
// ============================================================================

config_struct! {
    /// Notebook test runner
    pub struct NotebooksConfig {
        pattern: String = "notebooks/**/*.ipynb".to_string(),
        /// Code cells containing this are never executed
        skip_marker: String = "perform_grid_search".to_string(),
        timeout_secs: u64 = 600,
        kernel: String = "python3".to_string(),
        jupyter_command: String = "jupyter".to_string(),
        /// `skip-test-ci` pragmas apply when this variable is set
        ci_env_var: String = "CI".to_string(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        market_data: MarketDataConfig = MarketDataConfig::default(),
        universe: UniverseConfig = UniverseConfig::default(),
        risk: RiskConfig = RiskConfig::default(),
        wrangle: WrangleConfig = WrangleConfig::default(),
        output: OutputConfig = OutputConfig::default(),
        prefilter: PrefilterConfig = PrefilterConfig::default(),
        binance: BinanceConfig = BinanceConfig::default(),
        notebooks: NotebooksConfig = NotebooksConfig::default(),
    }
}
