/// SQLite risk score cache
///
/// Flow: Database -> API -> Database
///
/// Scores are keyed by `"{chain_id}-{address}"`. The database is opened in
/// WAL mode with a busy timeout so two runs sharing the file do not trip
/// over each other.
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ApiError, PipelineResult};
use crate::logger::{self, LogTag};

use super::{RiskAssessment, RiskScorer};

pub struct RiskCache {
    conn: Arc<Mutex<Connection>>,
}

impl RiskCache {
    /// Open (or create) the cache file
    pub fn open<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(30_000))?;

        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        cache.create_tables()?;

        logger::debug(
            LogTag::Cache,
            &format!("Risk cache opened at {}", path.as_ref().display()),
        );
        Ok(cache)
    }

    pub fn open_in_memory() -> PipelineResult<Self> {
        let cache = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        cache.create_tables()?;
        Ok(cache)
    }

    fn create_tables(&self) -> PipelineResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS risk_scores (
                key TEXT PRIMARY KEY,
                chain_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                score REAL NOT NULL,
                flagged INTEGER NOT NULL DEFAULT 0,
                fetched_at INTEGER NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_risk_scores_fetched ON risk_scores(fetched_at);
            "#,
        )?;
        Ok(())
    }

    /// Cached assessment, None when absent or older than `max_age_secs`
    ///
    /// `max_age_secs` of 0 never expires entries.
    pub fn get(
        &self,
        chain_id: u64,
        address: &str,
        max_age_secs: i64,
    ) -> PipelineResult<Option<RiskAssessment>> {
        let key = RiskAssessment::cache_key(chain_id, address);
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT chain_id, address, score, flagged, fetched_at, data
                 FROM risk_scores WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((chain_id, address, score, flagged, fetched_at, data)) = row else {
            return Ok(None);
        };

        if max_age_secs > 0 && Utc::now().timestamp() - fetched_at > max_age_secs {
            return Ok(None);
        }

        Ok(Some(RiskAssessment {
            chain_id: chain_id as u64,
            address,
            score,
            flagged: flagged != 0,
            fetched_at,
            raw: serde_json::from_str(&data).unwrap_or(serde_json::Value::Null),
        }))
    }

    pub fn put(&self, assessment: &RiskAssessment) -> PipelineResult<()> {
        let key = RiskAssessment::cache_key(assessment.chain_id, &assessment.address);
        let data = serde_json::to_string(&assessment.raw)?;
        self.conn.lock().execute(
            "INSERT INTO risk_scores (key, chain_id, address, score, flagged, fetched_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(key) DO UPDATE SET
                score = excluded.score,
                flagged = excluded.flagged,
                fetched_at = excluded.fetched_at,
                data = excluded.data",
            params![
                key,
                assessment.chain_id as i64,
                assessment.address.to_lowercase(),
                assessment.score,
                assessment.flagged as i64,
                assessment.fetched_at,
                data
            ],
        )?;
        Ok(())
    }

    pub fn count(&self) -> PipelineResult<usize> {
        let n: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM risk_scores", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Counters of a cached scorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheDiagnostics {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub fetched: usize,
    pub not_found: usize,
    pub errors: usize,
    pub cached_entries: usize,
}

impl std::fmt::Display for CacheDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cache hits {}, misses {}, fetched {}, not found {}, errors {}, entries in cache {}",
            self.cache_hits,
            self.cache_misses,
            self.fetched,
            self.not_found,
            self.errors,
            self.cached_entries
        )
    }
}

/// Any scorer with the SQLite cache in front of it
pub struct CachedRiskScorer {
    inner: Arc<dyn RiskScorer>,
    cache: RiskCache,
    max_age_secs: i64,
    stats: Mutex<CacheDiagnostics>,
}

impl CachedRiskScorer {
    pub fn new(inner: Arc<dyn RiskScorer>, cache: RiskCache, max_age_days: u64) -> Self {
        Self {
            inner,
            cache,
            max_age_secs: max_age_days as i64 * 86_400,
            stats: Mutex::new(CacheDiagnostics::default()),
        }
    }

    pub fn get_diagnostics(&self) -> CacheDiagnostics {
        let mut stats = self.stats.lock().clone();
        stats.cached_entries = self.cache.count().unwrap_or(0);
        stats
    }
}

#[async_trait]
impl RiskScorer for CachedRiskScorer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_risk_score(&self, chain_id: u64, address: &str) -> Result<RiskAssessment, ApiError> {
        // A broken cache degrades to a miss, it never stops the run
        match self.cache.get(chain_id, address, self.max_age_secs) {
            Ok(Some(hit)) => {
                self.stats.lock().cache_hits += 1;
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => logger::warning(
                LogTag::Cache,
                &format!("Risk cache read failed for {}: {}", address, e),
            ),
        }
        self.stats.lock().cache_misses += 1;

        match self.inner.fetch_risk_score(chain_id, address).await {
            Ok(assessment) => {
                self.stats.lock().fetched += 1;
                if let Err(e) = self.cache.put(&assessment) {
                    logger::warning(
                        LogTag::Cache,
                        &format!("Risk cache write failed for {}: {}", address, e),
                    );
                }
                Ok(assessment)
            }
            Err(e) => {
                let mut stats = self.stats.lock();
                if e.is_not_found() {
                    stats.not_found += 1;
                } else {
                    stats.errors += 1;
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::fake::FakeScorer;

    fn assessment(address: &str, score: f64, fetched_at: i64) -> RiskAssessment {
        RiskAssessment {
            chain_id: 1,
            address: address.to_string(),
            score,
            flagged: false,
            fetched_at,
            raw: serde_json::json!({ "score": score }),
        }
    }

    #[test]
    fn test_put_get_roundtrip_and_upsert() {
        let cache = RiskCache::open_in_memory().unwrap();
        let now = Utc::now().timestamp();

        cache.put(&assessment("0xAA", 50.0, now)).unwrap();
        cache.put(&assessment("0xaa", 80.0, now)).unwrap();

        let hit = cache.get(1, "0xAa", 0).unwrap().unwrap();
        assert_eq!(hit.score, 80.0);
        assert_eq!(hit.raw["score"], 80.0);
        assert_eq!(cache.count().unwrap(), 1);
        assert!(cache.get(56, "0xaa", 0).unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = RiskCache::open_in_memory().unwrap();
        let old = Utc::now().timestamp() - 10 * 86_400;
        cache.put(&assessment("0xbb", 50.0, old)).unwrap();

        assert!(cache.get(1, "0xbb", 86_400).unwrap().is_none());
        assert!(cache.get(1, "0xbb", 0).unwrap().is_some());
    }

    #[test]
    fn test_cache_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokensniffer.sqlite");
        {
            let cache = RiskCache::open(&path).unwrap();
            cache.put(&assessment("0xcc", 70.0, Utc::now().timestamp())).unwrap();
        }
        let cache = RiskCache::open(&path).unwrap();
        assert_eq!(cache.get(1, "0xcc", 0).unwrap().unwrap().score, 70.0);
    }

    #[tokio::test]
    async fn test_cached_scorer_fetches_once() {
        let fake = Arc::new(
            FakeScorer::default()
                .with("0xdd", Ok((90.0, false)))
                .with("0xee", Err(ApiError::Timeout)),
        );
        let scorer = CachedRiskScorer::new(fake.clone(), RiskCache::open_in_memory().unwrap(), 0);

        assert_eq!(scorer.fetch_risk_score(1, "0xdd").await.unwrap().score, 90.0);
        assert_eq!(scorer.fetch_risk_score(1, "0xDD").await.unwrap().score, 90.0);
        assert!(scorer.fetch_risk_score(1, "0xff").await.unwrap_err().is_not_found());
        assert_eq!(scorer.fetch_risk_score(1, "0xee").await.unwrap_err(), ApiError::Timeout);
        assert_eq!(fake.call_count(), 3);

        let diag = scorer.get_diagnostics();
        assert_eq!(diag.cache_hits, 1);
        assert_eq!(diag.fetched, 1);
        assert_eq!(diag.not_found, 1);
        assert_eq!(diag.errors, 1);
        assert_eq!(diag.cached_entries, 1);
    }
}
