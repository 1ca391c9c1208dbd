//! Processed-table cache.
//!
//! Layout: `{cache_dir}/{run_id}.parquet` plus a `{run_id}.meta.json` sidecar.
//! Tables are written atomically; a file that fails to load is renamed to
//! `{run_id}.parquet.quarantined` and treated as a miss.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wattscope_core::data::{load_table, save_table, FileFormat};
use wattscope_core::Table;

/// Sidecar describing one cached table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub run_id: String,
    pub dataset_hash: String,
    pub config_hash: String,
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub created_at: NaiveDateTime,
}

/// One line of `cache status`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub meta: CacheMeta,
    pub size_bytes: u64,
}

/// Outcome of a clean pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Run ids older than the cutoff.
    pub matched: Vec<String>,
    /// Files deleted (zero on a dry run).
    pub removed_files: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessedCache {
    cache_dir: PathBuf,
}

impl ProcessedCache {
    /// Open the cache, creating the directory if needed.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).with_context(|| {
            format!("failed to create cache directory {}", cache_dir.display())
        })?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn table_path(&self, run_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{run_id}.parquet"))
    }

    fn meta_path(&self, run_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{run_id}.meta.json"))
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.table_path(run_id).exists()
    }

    pub fn get_meta(&self, run_id: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(run_id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Load a cached table. Corrupt or inconsistent entries are quarantined
    /// and reported as a miss.
    pub fn get(&self, run_id: &str) -> Result<Option<Table>> {
        let path = self.table_path(run_id);
        if !path.exists() {
            return Ok(None);
        }

        let loaded = load_table(&path, FileFormat::Parquet)
            .map_err(anyhow::Error::from)
            .and_then(|table| {
                match self.get_meta(run_id) {
                    Some(meta) if meta.rows != table.height() || meta.columns != table.width() => {
                        anyhow::bail!(
                            "shape {:?} does not match metadata ({}, {})",
                            table.shape(),
                            meta.rows,
                            meta.columns
                        )
                    }
                    _ => Ok(table),
                }
            });

        match loaded {
            Ok(table) => {
                debug!(run_id, rows = table.height(), "cache hit");
                Ok(Some(table))
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                fs::rename(&path, &quarantine).with_context(|| {
                    format!("failed to quarantine {}", path.display())
                })?;
                let _ = fs::remove_file(self.meta_path(run_id));
                Ok(None)
            }
        }
    }

    /// Store `table` under `meta.run_id`.
    pub fn put(&self, meta: &CacheMeta, table: &Table) -> Result<()> {
        save_table(table, &self.table_path(&meta.run_id), FileFormat::Parquet)
            .context("failed to write cached table")?;
        let json = serde_json::to_string_pretty(meta).context("failed to serialize cache metadata")?;
        fs::write(self.meta_path(&meta.run_id), json).context("failed to write cache metadata")?;
        debug!(run_id = %meta.run_id, rows = meta.rows, "cached processed table");
        Ok(())
    }

    /// All entries with readable metadata, oldest first.
    pub fn status(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.cache_dir).context("failed to read cache directory")? {
            let path = entry?.path();
            let Some(run_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".meta.json"))
            else {
                continue;
            };
            let Some(meta) = self.get_meta(run_id) else {
                continue;
            };
            let size_bytes = fs::metadata(self.table_path(run_id))
                .map(|m| m.len())
                .unwrap_or(0);
            entries.push(CacheEntry { meta, size_bytes });
        }
        entries.sort_by(|a, b| {
            a.meta
                .created_at
                .cmp(&b.meta.created_at)
                .then_with(|| a.meta.run_id.cmp(&b.meta.run_id))
        });
        Ok(entries)
    }

    /// Remove entries created more than `older_than_days` days ago.
    /// Without `confirm` nothing is deleted.
    pub fn clean(&self, older_than_days: i64, confirm: bool) -> Result<CleanReport> {
        let cutoff = chrono::Local::now().naive_local() - Duration::days(older_than_days);
        self.clean_before(cutoff, confirm)
    }

    pub fn clean_before(&self, cutoff: NaiveDateTime, confirm: bool) -> Result<CleanReport> {
        let mut report = CleanReport::default();
        for entry in self.status()? {
            if entry.meta.created_at >= cutoff {
                continue;
            }
            let run_id = entry.meta.run_id;
            if confirm {
                for path in [
                    self.table_path(&run_id),
                    self.meta_path(&run_id),
                    self.table_path(&run_id).with_extension("parquet.quarantined"),
                ] {
                    if path.exists() {
                        fs::remove_file(&path)
                            .with_context(|| format!("failed to remove {}", path.display()))?;
                        report.removed_files += 1;
                    }
                }
            }
            report.matched.push(run_id);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wattscope_core::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::ints("a", [Some(1), Some(2)]),
            Column::floats("b", [Some(0.5), None]),
        ])
        .unwrap()
    }

    fn meta(run_id: &str, day: u32) -> CacheMeta {
        CacheMeta {
            run_id: run_id.to_string(),
            dataset_hash: "d".into(),
            config_hash: "c".into(),
            source: "fixture".into(),
            rows: 2,
            columns: 2,
            created_at: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path()).unwrap();

        assert!(cache.get("run1").unwrap().is_none());
        cache.put(&meta("run1", 1), &table()).unwrap();
        assert!(cache.contains("run1"));
        assert_eq!(cache.get("run1").unwrap(), Some(table()));
        assert_eq!(cache.get_meta("run1").unwrap().source, "fixture");
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path()).unwrap();
        cache.put(&meta("bad", 1), &table()).unwrap();
        fs::write(dir.path().join("bad.parquet"), b"not parquet").unwrap();

        assert!(cache.get("bad").unwrap().is_none());
        assert!(!cache.contains("bad"));
        assert!(dir.path().join("bad.parquet.quarantined").exists());
    }

    #[test]
    fn shape_mismatch_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path()).unwrap();
        let mut m = meta("skew", 1);
        m.rows = 99;
        cache.put(&m, &table()).unwrap();
        assert!(cache.get("skew").unwrap().is_none());
    }

    #[test]
    fn status_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path()).unwrap();
        cache.put(&meta("old", 1), &table()).unwrap();
        cache.put(&meta("new", 20), &table()).unwrap();

        let status = cache.status().unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].meta.run_id, "old");
        assert!(status[0].size_bytes > 0);

        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let dry = cache.clean_before(cutoff, false).unwrap();
        assert_eq!(dry.matched, vec!["old".to_string()]);
        assert_eq!(dry.removed_files, 0);
        assert!(cache.contains("old"));

        let done = cache.clean_before(cutoff, true).unwrap();
        assert_eq!(done.removed_files, 2);
        assert!(!cache.contains("old"));
        assert!(cache.contains("new"));
    }
}
