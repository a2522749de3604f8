//! Indicator cache: a memoization side-table in front of the calculators.
//!
//! Entries are keyed by (symbol, date of the last bar, indicator parameters).
//! The engine treats every cache as advisory: read failures and entries whose
//! shape does not fit the current series are misses, write failures are
//! logged and ignored. Invalidation belongs to whoever ingests new bars.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use screenlab_core::indicators::{IndicatorOutput, MacdSeries};
use screenlab_core::{IndicatorSpec, Symbol};

use crate::config::{CacheConfig, CacheMode};

/// Canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorKey {
    pub symbol: Symbol,
    /// Date of the series' last bar when the value was computed.
    pub as_of: NaiveDate,
    pub spec: IndicatorSpec,
}

impl IndicatorKey {
    /// Key for `spec` over `symbol`'s series ending at `as_of`.
    pub fn new(symbol: impl Into<Symbol>, as_of: NaiveDate, spec: IndicatorSpec) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            spec,
        }
    }

    /// Stable string form, e.g. `AAPL|2024-03-01|macd(12,26,9)`.
    pub fn canonical(&self) -> String {
        format!("{}|{}|{}", self.symbol, self.as_of, self.spec.key())
    }
}

/// Get/put memoization of calculator outputs.
///
/// Implementations must tolerate concurrent writers racing on the same key;
/// every writer stores the same deterministic value, so last-writer-wins.
pub trait IndicatorCache: Send + Sync {
    fn get(&self, key: &IndicatorKey) -> Result<Option<IndicatorOutput>>;
    fn put(&self, key: &IndicatorKey, output: &IndicatorOutput) -> Result<()>;
    /// Short label for logs.
    fn label(&self) -> &'static str;
}

/// Build the cache selected by configuration.
pub fn cache_from_config(config: &CacheConfig) -> Result<Option<Arc<dyn IndicatorCache>>> {
    Ok(match config.mode {
        CacheMode::None => None,
        CacheMode::Memory => Some(Arc::new(MemoryCache::new())),
        CacheMode::Disk => Some(Arc::new(DiskCache::new(&config.dir)?)),
    })
}

// ─── In-memory ───────────────────────────────────────────────────────

/// Process-local cache guarded by an `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<IndicatorKey, IndicatorOutput>>,
}

impl MemoryCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry for `symbol`. Returns how many were removed.
    pub fn invalidate_symbol(&self, symbol: &str) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        let before = entries.len();
        entries.retain(|key, _| key.symbol != symbol);
        Ok(before - entries.len())
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?
            .clear();
        Ok(())
    }

    /// Number of cached entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl IndicatorCache for MemoryCache {
    fn get(&self, key: &IndicatorKey) -> Result<Option<IndicatorOutput>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &IndicatorKey, output: &IndicatorOutput) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?
            .insert(key.clone(), output.clone());
        Ok(())
    }

    fn label(&self) -> &'static str {
        "memory"
    }
}

// ─── On-disk ─────────────────────────────────────────────────────────

/// JSON-file cache, one file per key, named by the BLAKE3 hash of the
/// canonical key. Writes go to a temp file in the same directory and are
/// renamed into place, so readers never see a partial entry.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

/// JSON has no NaN, so undefined values are stored as `null`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredOutput {
    Series {
        values: Vec<Option<f64>>,
    },
    Macd {
        macd: Vec<Option<f64>>,
        signal: Vec<Option<f64>>,
        histogram: Vec<Option<f64>>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: IndicatorKey,
    output: StoredOutput,
}

fn to_stored(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| if v.is_finite() { Some(*v) } else { None })
        .collect()
}

fn from_stored(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

impl From<&IndicatorOutput> for StoredOutput {
    fn from(output: &IndicatorOutput) -> Self {
        match output {
            IndicatorOutput::Series(values) => StoredOutput::Series {
                values: to_stored(values),
            },
            IndicatorOutput::Macd(m) => StoredOutput::Macd {
                macd: to_stored(&m.macd),
                signal: to_stored(&m.signal),
                histogram: to_stored(&m.histogram),
            },
        }
    }
}

impl From<StoredOutput> for IndicatorOutput {
    fn from(stored: StoredOutput) -> Self {
        match stored {
            StoredOutput::Series { values } => IndicatorOutput::Series(from_stored(values)),
            StoredOutput::Macd {
                macd,
                signal,
                histogram,
            } => IndicatorOutput::Macd(MacdSeries {
                macd: from_stored(macd),
                signal: from_stored(signal),
                histogram: from_stored(histogram),
            }),
        }
    }
}

impl DiskCache {
    /// Creates the directory if it doesn't exist.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).with_context(|| {
            format!("failed to create cache directory {}", cache_dir.display())
        })?;
        Ok(Self { cache_dir })
    }

    /// Directory holding the entry files.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Remove every cache file. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entry_paths()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let entries = std::fs::read_dir(&self.cache_dir)
            .with_context(|| format!("failed to list {}", self.cache_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn entry_path(&self, key: &IndicatorKey) -> PathBuf {
        let hash = blake3::hash(key.canonical().as_bytes());
        self.cache_dir.join(format!("{}.json", hash.to_hex()))
    }
}

impl IndicatorCache for DiskCache {
    fn get(&self, key: &IndicatorKey) -> Result<Option<IndicatorOutput>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read cache entry {}", path.display()))?;
        let entry: DiskEntry = serde_json::from_str(&json)
            .with_context(|| format!("failed to deserialize cache entry {}", path.display()))?;

        if entry.key != *key {
            return Ok(None);
        }
        Ok(Some(entry.output.into()))
    }

    fn put(&self, key: &IndicatorKey, output: &IndicatorOutput) -> Result<()> {
        let path = self.entry_path(key);
        let entry = DiskEntry {
            key: key.clone(),
            output: output.into(),
        };
        let json = serde_json::to_vec(&entry).context("failed to serialize cache entry")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .context("failed to create temp file for cache entry")?;
        tmp.write_all(&json)
            .context("failed to write cache entry")?;
        tmp.persist(&path)
            .with_context(|| format!("failed to move cache entry into {}", path.display()))?;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "disk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str, spec: IndicatorSpec) -> IndicatorKey {
        IndicatorKey::new(symbol, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), spec)
    }

    fn rsi_output() -> IndicatorOutput {
        IndicatorOutput::Series(vec![f64::NAN, f64::NAN, 55.5, 61.25])
    }

    fn macd_output() -> IndicatorOutput {
        IndicatorOutput::Macd(MacdSeries {
            macd: vec![f64::NAN, 0.1, -0.2],
            signal: vec![f64::NAN, f64::NAN, 0.05],
            histogram: vec![f64::NAN, f64::NAN, -0.25],
        })
    }

    fn same_bits(a: &IndicatorOutput, b: &IndicatorOutput) -> bool {
        fn eq(x: &[f64], y: &[f64]) -> bool {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|(a, b)| (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits())
        }
        match (a, b) {
            (IndicatorOutput::Series(x), IndicatorOutput::Series(y)) => eq(x, y),
            (IndicatorOutput::Macd(x), IndicatorOutput::Macd(y)) => {
                eq(&x.macd, &y.macd) && eq(&x.signal, &y.signal) && eq(&x.histogram, &y.histogram)
            }
            _ => false,
        }
    }

    #[test]
    fn canonical_key_format() {
        let k = key("AAPL", IndicatorSpec::Macd { fast: 12, slow: 26, signal: 9 });
        assert_eq!(k.canonical(), "AAPL|2024-03-01|macd(12,26,9)");
    }

    #[test]
    fn memory_put_get() {
        let cache = MemoryCache::new();
        let k = key("AAPL", IndicatorSpec::Rsi { period: 14 });
        assert!(cache.get(&k).unwrap().is_none());

        cache.put(&k, &rsi_output()).unwrap();
        let got = cache.get(&k).unwrap().unwrap();
        assert!(same_bits(&got, &rsi_output()));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn memory_parameters_distinguish_entries() {
        let cache = MemoryCache::new();
        cache.put(&key("AAPL", IndicatorSpec::Rsi { period: 14 }), &rsi_output()).unwrap();
        assert!(cache
            .get(&key("AAPL", IndicatorSpec::Rsi { period: 7 }))
            .unwrap()
            .is_none());
    }

    #[test]
    fn memory_invalidate_symbol() {
        let cache = MemoryCache::new();
        cache.put(&key("AAPL", IndicatorSpec::Rsi { period: 14 }), &rsi_output()).unwrap();
        cache.put(&key("AAPL", IndicatorSpec::Sma { period: 20 }), &rsi_output()).unwrap();
        cache.put(&key("MSFT", IndicatorSpec::Rsi { period: 14 }), &rsi_output()).unwrap();

        assert_eq!(cache.invalidate_symbol("AAPL").unwrap(), 2);
        assert_eq!(cache.len().unwrap(), 1);

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn disk_put_get_preserves_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path()).unwrap();

        let rsi_key = key("AAPL", IndicatorSpec::Rsi { period: 14 });
        let macd_key = key("AAPL", IndicatorSpec::Macd { fast: 12, slow: 26, signal: 9 });
        assert!(cache.get(&rsi_key).unwrap().is_none());

        cache.put(&rsi_key, &rsi_output()).unwrap();
        cache.put(&macd_key, &macd_output()).unwrap();

        assert!(same_bits(&cache.get(&rsi_key).unwrap().unwrap(), &rsi_output()));
        assert!(same_bits(&cache.get(&macd_key).unwrap().unwrap(), &macd_output()));
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn disk_overwrite_is_last_writer_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path()).unwrap();
        let k = key("AAPL", IndicatorSpec::Sma { period: 2 });

        cache.put(&k, &IndicatorOutput::Series(vec![1.0])).unwrap();
        cache.put(&k, &IndicatorOutput::Series(vec![2.0])).unwrap();
        assert_eq!(cache.get(&k).unwrap(), Some(IndicatorOutput::Series(vec![2.0])));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn disk_clear_removes_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path()).unwrap();
        for period in 1..=5 {
            cache
                .put(&key("AAPL", IndicatorSpec::Sma { period }), &rsi_output())
                .unwrap();
        }
        assert_eq!(cache.len().unwrap(), 5);
        assert_eq!(cache.clear().unwrap(), 5);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn disk_corrupt_entry_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path()).unwrap();
        let k = key("AAPL", IndicatorSpec::Rsi { period: 14 });
        std::fs::write(cache.entry_path(&k), "{not json").unwrap();
        assert!(cache.get(&k).is_err());
    }

    #[test]
    fn concurrent_writers_agree() {
        let cache = Arc::new(MemoryCache::new());
        let k = key("AAPL", IndicatorSpec::Rsi { period: 14 });
        std::thread::scope(|s| {
            for _ in 0..8 {
                let cache = Arc::clone(&cache);
                let k = k.clone();
                s.spawn(move || cache.put(&k, &rsi_output()).unwrap());
            }
        });
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn config_selects_cache() {
        let temp_dir = tempfile::tempdir().unwrap();
        let none = CacheConfig {
            mode: CacheMode::None,
            ..CacheConfig::default()
        };
        assert!(cache_from_config(&none).unwrap().is_none());

        let disk = CacheConfig {
            mode: CacheMode::Disk,
            dir: temp_dir.path().join("nested"),
        };
        let cache = cache_from_config(&disk).unwrap().unwrap();
        assert_eq!(cache.label(), "disk");
        assert!(temp_dir.path().join("nested").is_dir());
    }
}
