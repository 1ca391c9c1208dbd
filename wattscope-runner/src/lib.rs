//! WattScope Runner: analysis runs over `wattscope-core`.
//!
//! - Content-addressed runs (dataset hash + config hash)
//! - Parquet cache of processed tables with quarantine of corrupt entries
//! - JSON / CSV / Markdown export of quality reports

pub mod cache;
pub mod export;
pub mod runner;

pub use cache::{CacheEntry, CacheMeta, CleanReport, ProcessedCache};
pub use export::{describe_csv, markdown_summary, outliers_csv, report_json, save_artifacts};
pub use runner::{run_analysis, run_id, AnalysisRun, RunError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn analysis_run_is_send_sync() {
        assert_send::<AnalysisRun>();
        assert_sync::<AnalysisRun>();
    }

    #[test]
    fn cache_is_send_sync() {
        assert_send::<ProcessedCache>();
        assert_sync::<ProcessedCache>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
