/// Parquet read and write through polars
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};

use super::ParquetCodec;

fn compression(codec: ParquetCodec, level: i32) -> PipelineResult<ParquetCompression> {
    match codec {
        ParquetCodec::Zstd => {
            let level = ZstdLevel::try_new(level)?;
            Ok(ParquetCompression::Zstd(Some(level)))
        }
        ParquetCodec::Snappy => Ok(ParquetCompression::Snappy),
        ParquetCodec::Uncompressed => Ok(ParquetCompression::Uncompressed),
    }
}

/// Write `df` to `path`, creating parent directories; returns bytes written
///
/// Writes to a sibling temp file first so a crash never leaves a truncated
/// dataset behind.
pub fn write_parquet(
    df: &mut DataFrame,
    path: &Path,
    codec: ParquetCodec,
    level: i32,
) -> PipelineResult<u64> {
    if !codec.level_in_range(level) {
        return Err(PipelineError::config(format!(
            "Compression level {} out of range for {}",
            level, codec
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let compression = compression(codec, level)?;
    let tmp_path = path.with_extension("parquet.tmp");
    let written = File::create(&tmp_path)
        .map_err(PipelineError::from)
        .and_then(|mut file| {
            Ok(ParquetWriter::new(&mut file)
                .with_compression(compression)
                .finish(df)?)
        })
        .and_then(|bytes| {
            std::fs::rename(&tmp_path, path)?;
            Ok(bytes)
        });
    let bytes = match written {
        Ok(bytes) => bytes,
        Err(e) => {
            // Never leave a half-written temp file next to the dataset
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
    };

    logger::debug(
        LogTag::Export,
        &format!(
            "Wrote {} rows to {} ({} {}, {} bytes)",
            df.height(),
            path.display(),
            codec,
            level,
            bytes
        ),
    );
    Ok(bytes)
}

pub fn read_parquet(path: &Path) -> PipelineResult<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
