use crate::filter::DateFilter;
use crate::report::fmt::{ceprintln, DIM, RESET};
use crate::report::ReportKind;
use crate::source::{LineSource, ReadStrategy};
use crate::table::CountTable;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub kind: ReportKind,
    pub strategy: ReadStrategy,
    pub workers: usize,
    pub filter: DateFilter,
    pub verbose: bool,
}

impl DispatchConfig {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            strategy: ReadStrategy::Lines,
            workers: DEFAULT_WORKERS,
            filter: DateFilter::default(),
            verbose: false,
        }
    }
}

/// What one worker produced for one file.
#[derive(Debug, Clone, Default)]
pub struct FileTally {
    pub path: PathBuf,
    pub lines: u64,
    pub events: u64,
    pub error: Option<String>,
    pub table: CountTable,
}

/// Merged counts of every file. Per-file tables have been folded into `table`.
#[derive(Debug)]
pub struct FinalReport {
    pub table: CountTable,
    pub total: u64,
    pub files: Vec<FileTally>,
}

/// Runs one file end to end. Never fails: I/O problems end the file early and
/// are recorded in the returned tally.
pub async fn tally_file(
    path: &Path,
    kind: ReportKind,
    strategy: ReadStrategy,
    filter: &DateFilter,
) -> FileTally {
    let mut source = LineSource::open(path, strategy).await;
    let mut table = CountTable::new();
    let mut events = 0;
    while let Some(line) = source.next_line().await {
        if kind.record(&mut table, &line, filter) {
            events += 1;
        }
    }
    FileTally {
        path: path.to_path_buf(),
        lines: source.lines_read(),
        events,
        error: source.into_error(),
        table,
    }
}

/// Tallies every file on at most `cfg.workers` concurrent tasks and merges the
/// results once all of them have finished.
pub async fn run(paths: Vec<PathBuf>, cfg: &DispatchConfig) -> FinalReport {
    let semaphore = Arc::new(Semaphore::new(cfg.workers.max(1)));
    let filter = Arc::new(cfg.filter.clone());
    let mut workers = JoinSet::new();

    for path in paths {
        let semaphore = Arc::clone(&semaphore);
        let filter = Arc::clone(&filter);
        let (kind, strategy, verbose) = (cfg.kind, cfg.strategy, cfg.verbose);
        workers.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            if verbose {
                ceprintln!("{DIM}[logtally] reading {}{RESET}", path.display());
            }
            tally_file(&path, kind, strategy, &filter).await
        });
    }

    merge_joined(workers).await
}

/// Waits for every task and folds the finished tallies together. A task that
/// panicked or was cancelled is reported and contributes nothing.
async fn merge_joined(mut workers: JoinSet<FileTally>) -> FinalReport {
    let mut table = CountTable::new();
    let mut files = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(mut tally) => {
                table.merge_from(std::mem::take(&mut tally.table));
                files.push(tally);
            }
            Err(e) => eprintln!("[logtally] worker failed: {e}"),
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let total = table.total();
    FinalReport {
        table,
        total,
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;
    use std::fs;

    const APP1: &str = "\
2023-04-20 12:34:56,789 INFO django.request: /api/v1/users
2023-04-20 12:35:00,123 ERROR django.request: /api/v1/orders
Traceback (most recent call last):
2023-04-20 12:36:01,456 INFO django.request: /api/v1/users
2023-04-20 12:37:10,789 WARNING django.request: /api/v1/orders
";

    const APP2: &str = "\
2023-04-21 08:00:00,000 DEBUG django.request: /api/v1/users
2023-04-21 08:00:01,000 CRITICAL django.request: /admin/
2023-04-21 08:00:02,000 INFO django.db.backends: SELECT 1
2023-04-21 08:00:03,000 INFO django.request: /api/v1/users";

    fn write_logs(dir: &Path) -> Vec<PathBuf> {
        let a = dir.join("app1.log");
        let b = dir.join("app2.log");
        fs::write(&a, APP1).unwrap();
        fs::write(&b, APP2).unwrap();
        vec![a, b]
    }

    #[tokio::test]
    async fn single_file_matches_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_logs(dir.path());
        let report = run(vec![paths[0].clone()], &DispatchConfig::new(ReportKind::Handlers)).await;

        assert_eq!(report.total, 4);
        assert_eq!(report.table.count("/api/v1/users", Level::Info), 2);
        assert_eq!(report.table.count("/api/v1/orders", Level::Error), 1);
        assert_eq!(report.table.count("/api/v1/orders", Level::Warning), 1);
        assert_eq!(report.files[0].lines, 5);
        assert_eq!(report.files[0].events, 4);
        assert!(report.files[0].table.is_empty());
    }

    #[tokio::test]
    async fn missing_file_does_not_stop_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_logs(dir.path());
        paths.insert(1, dir.path().join("missing.log"));

        let report = run(paths, &DispatchConfig::new(ReportKind::Handlers)).await;

        assert_eq!(report.files.len(), 3);
        let missing = report
            .files
            .iter()
            .find(|f| f.path.ends_with("missing.log"))
            .unwrap();
        assert!(missing.error.is_some());
        assert_eq!(missing.lines, 0);
        assert_eq!(report.total, 7);
        assert_eq!(report.table.count("/admin/", Level::Critical), 1);
        assert_eq!(report.table.count("/api/v1/users", Level::Info), 3);
    }

    #[tokio::test]
    async fn result_is_independent_of_worker_count_and_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_logs(dir.path());
        for i in 0..6 {
            let p = dir.path().join(format!("extra{i}.log"));
            fs::write(&p, APP1.repeat(i + 1)).unwrap();
            paths.push(p);
        }

        let baseline = run(paths.clone(), &DispatchConfig::new(ReportKind::Handlers)).await;
        for workers in [1, 2, 3, 16] {
            for strategy in [
                ReadStrategy::Lines,
                ReadStrategy::Chunked { chunk_size: 7 },
            ] {
                let cfg = DispatchConfig {
                    workers,
                    strategy,
                    ..DispatchConfig::new(ReportKind::Handlers)
                };
                let report = run(paths.clone(), &cfg).await;
                assert_eq!(report.table, baseline.table, "{workers} workers, {strategy:?}");
                assert_eq!(report.total, baseline.total);
            }
        }
        assert_eq!(baseline.total, 7 + 4 * (1 + 2 + 3 + 4 + 5 + 6));
    }

    #[tokio::test]
    async fn directory_input_yields_empty_partial() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(
            vec![dir.path().to_path_buf()],
            &DispatchConfig::new(ReportKind::Handlers),
        )
        .await;
        assert!(report.table.is_empty());
        assert_eq!(report.total, 0);
        assert!(report.files[0].error.is_some());
    }

    #[tokio::test]
    async fn date_filter_applies_to_every_worker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_logs(dir.path());
        let cfg = DispatchConfig {
            filter: DateFilter {
                since: chrono::NaiveDate::from_ymd_opt(2023, 4, 21),
                until: None,
            },
            ..DispatchConfig::new(ReportKind::Handlers)
        };
        let report = run(paths, &cfg).await;
        assert_eq!(report.total, 3);
        assert_eq!(report.table.count("/api/v1/users", Level::Info), 1);
        assert_eq!(report.table.count("/api/v1/orders", Level::Error), 0);
    }

    #[tokio::test]
    async fn panicking_worker_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_logs(dir.path());
        let mut workers: JoinSet<FileTally> = JoinSet::new();
        for path in paths {
            workers.spawn(async move {
                let filter = DateFilter::default();
                tally_file(&path, ReportKind::Handlers, ReadStrategy::Lines, &filter).await
            });
        }
        workers.spawn(async { panic!("worker blew up") });

        let report = merge_joined(workers).await;
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.total, 7);
        assert_eq!(report.table.count("/api/v1/users", Level::Info), 3);
    }

    #[tokio::test]
    async fn no_files_yields_empty_report() {
        let report = run(Vec::new(), &DispatchConfig::new(ReportKind::Handlers)).await;
        assert!(report.table.is_empty());
        assert!(report.files.is_empty());
    }
}
