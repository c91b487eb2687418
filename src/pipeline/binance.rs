/// Binance spot candles to a per-symbol Parquet cache
///
/// Every trading spot symbol is downloaded once into
/// `{cache_dir}/{SYMBOL}-{bucket}.parquet`; symbols already cached are
/// skipped. The cached files of the bucket are then combined into one file.
use futures::stream::{self, StreamExt};
use polars::prelude::*;
use std::path::{Path, PathBuf};

use crate::apis::binance::{BinanceClient, BinanceKline};
use crate::config::{parse_date_to_unix, Config};
use crate::errors::{PipelineError, PipelineResult};
use crate::export::{read_parquet, write_parquet};
use crate::logger::{self, LogTag};
use crate::market::TimeBucket;

#[derive(Debug, Clone, Default)]
pub struct BinanceReport {
    pub symbols: usize,
    pub downloaded: usize,
    pub already_cached: usize,
    /// Symbols whose download failed, the run continues without them
    pub failed: Vec<String>,
    pub combined_rows: usize,
    pub combined_path: Option<PathBuf>,
}

pub fn symbol_cache_path(cache_dir: &Path, symbol: &str, bucket: TimeBucket) -> PathBuf {
    cache_dir.join(format!("{}-{}.parquet", symbol, bucket))
}

pub fn klines_to_frame(klines: &[BinanceKline]) -> PipelineResult<DataFrame> {
    let millis: Vec<i64> = klines.iter().map(|k| k.timestamp * 1000).collect();
    Ok(DataFrame::new(vec![
        Column::new(
            "symbol".into(),
            klines.iter().map(|k| k.symbol.clone()).collect::<Vec<String>>(),
        ),
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Column::new("open".into(), klines.iter().map(|k| k.open).collect::<Vec<f64>>()),
        Column::new("high".into(), klines.iter().map(|k| k.high).collect::<Vec<f64>>()),
        Column::new("low".into(), klines.iter().map(|k| k.low).collect::<Vec<f64>>()),
        Column::new("close".into(), klines.iter().map(|k| k.close).collect::<Vec<f64>>()),
        Column::new("volume".into(), klines.iter().map(|k| k.volume).collect::<Vec<f64>>()),
        Column::new(
            "quote_volume".into(),
            klines.iter().map(|k| k.quote_volume).collect::<Vec<f64>>(),
        ),
        Column::new("trades".into(), klines.iter().map(|k| k.trades).collect::<Vec<u64>>()),
    ])?)
}

/// Combine every cached file of `bucket` into one frame
///
/// Files of other buckets are skipped with a warning. None when nothing
/// is cached.
pub fn combine_cached_klines(
    cache_dir: &Path,
    bucket: TimeBucket,
) -> PipelineResult<Option<DataFrame>> {
    let suffix = format!("-{}.parquet", bucket);
    let mut files: Vec<PathBuf> = std::fs::read_dir(cache_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "parquet"))
        .collect();
    files.sort();

    let mut combined: Option<DataFrame> = None;
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !name.ends_with(&suffix) {
            logger::warning(
                LogTag::Binance,
                &format!("Skipping {} that does not match the time bucket {}", name, bucket),
            );
            continue;
        }

        let df = read_parquet(&path)?;
        match combined.as_mut() {
            Some(all) => {
                all.vstack_mut(&df)?;
            }
            None => combined = Some(df),
        }
    }

    if let Some(df) = combined.as_mut() {
        df.as_single_chunk_par();
    }
    Ok(combined)
}

async fn download_symbol(
    client: &BinanceClient,
    symbol: &str,
    bucket: TimeBucket,
    start: i64,
    end: i64,
    path: &Path,
    config: &Config,
) -> PipelineResult<usize> {
    let klines = client
        .fetch_klines(symbol, bucket, start, end)
        .await
        .map_err(|e| PipelineError::api("Binance", e))?;

    // Empty files mark symbols without history so they are not retried
    let mut df = klines_to_frame(&klines)?;
    write_parquet(
        &mut df,
        path,
        config.output.parquet_compression,
        config.output.parquet_compression_level,
    )?;
    Ok(klines.len())
}

pub async fn run_binance_download(
    config: &Config,
    client: &BinanceClient,
    cache_dir: &Path,
    output_dir: &Path,
    now: i64,
) -> PipelineResult<BinanceReport> {
    let binance = &config.binance;
    let bucket = binance.time_bucket;
    let start = parse_date_to_unix(&binance.start_date)?;
    let end = match binance.end_date.as_deref() {
        Some(date) => parse_date_to_unix(date)?,
        None => bucket.floor(now),
    };

    std::fs::create_dir_all(cache_dir)?;
    logger::info(
        LogTag::Binance,
        &format!("Downloading all Binance spot pairs with a time bucket of {}", bucket),
    );

    let symbols = client
        .fetch_spot_symbols(&binance.quote_assets)
        .await
        .map_err(|e| PipelineError::api("Binance", e))?;

    let mut report = BinanceReport {
        symbols: symbols.len(),
        ..Default::default()
    };

    let pending: Vec<(String, PathBuf)> = symbols
        .iter()
        .map(|s| (s.symbol.clone(), symbol_cache_path(cache_dir, &s.symbol, bucket)))
        .filter(|(_, path)| !path.exists())
        .collect();
    report.already_cached = symbols.len() - pending.len();
    logger::info(
        LogTag::Binance,
        &format!(
            "{} symbols, {} already cached, {} to download",
            symbols.len(),
            report.already_cached,
            pending.len()
        ),
    );

    let total = pending.len();
    let results: Vec<(String, PipelineResult<usize>)> = stream::iter(pending.into_iter().enumerate())
        .map(|(idx, (symbol, path))| async move {
            let result = download_symbol(client, &symbol, bucket, start, end, &path, config).await;
            if let Ok(rows) = &result {
                logger::debug(
                    LogTag::Binance,
                    &format!("[{}/{}] {}: {} candles", idx + 1, total, symbol, rows),
                );
            }
            (symbol, result)
        })
        .buffer_unordered(binance.download_concurrency.max(1))
        .collect()
        .await;

    for (symbol, result) in results {
        match result {
            Ok(_) => report.downloaded += 1,
            Err(e) => {
                logger::warning(
                    LogTag::Binance,
                    &format!("Could not download {}: {}", symbol, e),
                );
                report.failed.push(symbol);
            }
        }
    }
    report.failed.sort();

    logger::info(LogTag::Binance, "Finished downloading all spot pairs, combining");
    if let Some(mut combined) = combine_cached_klines(cache_dir, bucket)? {
        let path = output_dir.join(binance.combined_file_name.replace("{bucket}", bucket.as_str()));
        write_parquet(
            &mut combined,
            &path,
            config.output.parquet_compression,
            config.output.parquet_compression_level,
        )?;
        logger::info(
            LogTag::Export,
            &format!("Combined {} rows into {}", combined.height(), path.display()),
        );
        report.combined_rows = combined.height();
        report.combined_path = Some(path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ParquetCodec;

    fn kline(symbol: &str, timestamp: i64) -> BinanceKline {
        BinanceKline {
            symbol: symbol.to_string(),
            timestamp,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
            quote_volume: 15.0,
            trades: 3,
        }
    }

    fn write(path: &Path, klines: &[BinanceKline]) {
        let mut df = klines_to_frame(klines).unwrap();
        write_parquet(&mut df, path, ParquetCodec::Zstd, 15).unwrap();
    }

    #[test]
    fn test_combine_only_matching_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = TimeBucket::D1;
        write(
            &symbol_cache_path(dir.path(), "ETHBTC", bucket),
            &[kline("ETHBTC", 0), kline("ETHBTC", 86_400)],
        );
        write(&symbol_cache_path(dir.path(), "BTCUSDT", bucket), &[kline("BTCUSDT", 0)]);
        write(&symbol_cache_path(dir.path(), "BTCUSDT", TimeBucket::H1), &[kline("BTCUSDT", 0)]);
        // Empty history marker
        write(&symbol_cache_path(dir.path(), "NEWUSDT", bucket), &[]);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let combined = combine_cached_klines(dir.path(), bucket).unwrap().unwrap();
        assert_eq!(combined.height(), 3);
        assert_eq!(combined.width(), 9);
    }

    #[test]
    fn test_combine_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(combine_cached_klines(dir.path(), TimeBucket::D1).unwrap().is_none());
    }

    #[test]
    fn test_cache_path_includes_bucket() {
        let path = symbol_cache_path(Path::new("/tmp/binance"), "ETHBTC", TimeBucket::D7);
        assert_eq!(path, PathBuf::from("/tmp/binance/ETHBTC-7d.parquet"));
    }
}
