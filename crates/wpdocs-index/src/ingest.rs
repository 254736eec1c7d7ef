//! Concurrent ingestion: a fixed worker pool drains a file queue into the
//! shared registry.
//!
//! Every worker owns its extractor state. The registry is the only shared
//! resource, and every symbol is inserted as soon as the extractor emits it.
//! A failure on one file is logged and recorded; the run always attempts
//! every queued file unless it is cancelled.

use crate::extractor::{ExtractorSet, FileExtractor, SymbolSink};
use crate::registry::Registry;
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wpdocs_core::{HookCall, Symbol, WpdocsError};

/// Stop signal checked by workers between files.
///
/// Cancelling never interrupts a file mid-extraction, so the registry is
/// left consistent (if incomplete).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips once `timeout` has elapsed from now. A
    /// timeout too large to represent means no deadline.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A file that contributed nothing because extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Files queued.
    pub files_total: usize,
    /// Files extracted without error.
    pub files_parsed: usize,
    /// Files whose extraction failed.
    pub files_failed: usize,
    /// Files never attempted because the run was cancelled.
    pub files_skipped: usize,
    /// Non-hook symbols inserted.
    pub symbols_emitted: usize,
    /// Hook-firing events folded into hook symbols.
    pub hook_calls: usize,
    /// Per-file failures, sorted by path.
    pub failures: Vec<FileFailure>,
    pub cancelled: bool,
}

impl IngestReport {
    fn absorb(&mut self, other: IngestReport) {
        self.files_parsed += other.files_parsed;
        self.files_failed += other.files_failed;
        self.files_skipped += other.files_skipped;
        self.symbols_emitted += other.symbols_emitted;
        self.hook_calls += other.hook_calls;
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }
}

/// Sink that writes straight into the shared registry.
struct RegistrySink<'r> {
    registry: &'r Registry,
    symbols: usize,
    hook_calls: usize,
}

impl SymbolSink for RegistrySink<'_> {
    fn emit(&mut self, symbol: Symbol) {
        self.registry.insert(symbol);
        self.symbols += 1;
    }

    fn emit_hook_call(&mut self, call: HookCall) {
        self.registry.upsert_hook(call);
        self.hook_calls += 1;
    }
}

/// The worker pool.
pub struct Ingestor<'a> {
    extractors: &'a ExtractorSet,
    workers: usize,
    src_root: Option<PathBuf>,
    cancel: CancelToken,
}

impl<'a> Ingestor<'a> {
    /// A pool with one worker per available CPU.
    pub fn new(extractors: &'a ExtractorSet) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            extractors,
            workers,
            src_root: None,
            cancel: CancelToken::new(),
        }
    }

    /// Number of workers; zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Directory that queued relative paths are read from.
    pub fn src_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.src_root = Some(root.into());
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Extract every file into `registry` and wait for all workers to drain.
    ///
    /// Returns only after the last worker has finished, so the registry is
    /// closed to ingestion when this returns.
    pub fn ingest(&self, files: &[String], registry: &Registry) -> IngestReport {
        let mut report = IngestReport {
            files_total: files.len(),
            ..IngestReport::default()
        };
        if files.is_empty() {
            return report;
        }

        let (tx, rx) = crossbeam_channel::unbounded::<&str>();
        for file in files {
            // The receiver is alive until the pool below finishes.
            let _ = tx.send(file.as_str());
        }
        drop(tx);

        let workers = self.workers.min(files.len());
        let started = Instant::now();

        let worker_reports: Vec<IngestReport> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let rx = rx.clone();
                    scope.spawn(move || self.run_worker(rx, registry))
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|h| match h.join() {
                    Ok(r) => Some(r),
                    Err(_) => {
                        tracing::error!("Ingestion worker panicked");
                        None
                    }
                })
                .collect()
        });

        for r in worker_reports {
            report.absorb(r);
        }
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));

        if report.files_failed > 0 {
            tracing::warn!("{} files had extraction errors", report.files_failed);
        }
        if report.cancelled {
            tracing::warn!(
                "Ingestion cancelled, {} files not attempted",
                report.files_skipped
            );
        }
        tracing::info!(
            "Ingested {} files with {} workers in {:?}: {} parsed, {} failed, {} symbols, {} hook calls",
            report.files_total,
            workers,
            started.elapsed(),
            report.files_parsed,
            report.files_failed,
            report.symbols_emitted,
            report.hook_calls,
        );

        report
    }

    fn run_worker(&self, rx: Receiver<&str>, registry: &Registry) -> IngestReport {
        let mut report = IngestReport::default();
        let mut states: Vec<Option<Box<dyn FileExtractor + 'a>>> =
            (0..self.extractors.len()).map(|_| None).collect();

        for path in rx.iter() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                report.files_skipped += 1;
                continue;
            }

            let mut sink = RegistrySink {
                registry,
                symbols: 0,
                hook_calls: 0,
            };
            let result = self.ingest_file(path, &mut states, &mut sink);
            report.symbols_emitted += sink.symbols;
            report.hook_calls += sink.hook_calls;

            match result {
                Ok(()) => {
                    report.files_parsed += 1;
                    tracing::debug!("{path}: {} symbols, {} hook calls", sink.symbols, sink.hook_calls);
                }
                Err(err) => {
                    tracing::warn!("Failed to extract {path}: {err}");
                    report.files_failed += 1;
                    report.failures.push(FileFailure {
                        path: path.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        report
    }

    fn ingest_file(
        &self,
        path: &str,
        states: &mut [Option<Box<dyn FileExtractor + 'a>>],
        sink: &mut RegistrySink<'_>,
    ) -> Result<(), WpdocsError> {
        let index = self
            .extractors
            .position_for(path)
            .ok_or_else(|| WpdocsError::Unsupported(path.to_string()))?;
        let extractor = self
            .extractors
            .get(index)
            .ok_or_else(|| WpdocsError::Internal(format!("no extractor at {index}")))?;

        let source = std::fs::read(self.resolve_path(path))?;

        let state = states[index].get_or_insert_with(|| extractor.new_worker());
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            state.extract_file(path, &source, sink)
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => {
                // The state may be half-updated; start the next file fresh.
                states[index] = None;
                Err(WpdocsError::Extraction(format!(
                    "{} extractor panicked",
                    extractor.language_name()
                )))
            }
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.src_root {
            Some(root) => root.join(path),
            None => Path::new(path).to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LanguageExtractor;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use wpdocs_core::{HookType, SymbolKind};

    /// Emits one function per line of the file; a line `hook <tag>` fires a
    /// hook instead, and a line `fail` aborts the file.
    struct LineExtractor {
        workers_created: Arc<AtomicUsize>,
    }

    struct LineWorker;

    impl FileExtractor for LineWorker {
        fn extract_file(
            &mut self,
            path: &str,
            source: &[u8],
            sink: &mut dyn SymbolSink,
        ) -> Result<(), WpdocsError> {
            let text = String::from_utf8_lossy(source);
            for (i, line) in text.lines().enumerate() {
                if line == "fail" {
                    return Err(WpdocsError::Extraction("bad line".to_string()));
                }
                if line == "panic" {
                    panic!("extractor bug");
                }
                if let Some(tag) = line.strip_prefix("hook ") {
                    sink.emit_hook_call(HookCall::new(tag, HookType::Action, path, i + 1));
                } else {
                    sink.emit(Symbol::new(line, line, SymbolKind::Function, "php").at(path, i + 1, i + 1));
                }
            }
            Ok(())
        }
    }

    impl LanguageExtractor for LineExtractor {
        fn language_name(&self) -> &str {
            "php"
        }

        fn file_extensions(&self) -> &[&str] {
            &["php"]
        }

        fn new_worker(&self) -> Box<dyn FileExtractor + '_> {
            self.workers_created.fetch_add(1, Ordering::SeqCst);
            Box::new(LineWorker)
        }
    }

    fn setup(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for (path, content) in files {
            fs::write(dir.join(path), content).unwrap();
        }
        dir
    }

    fn extractors() -> ExtractorSet {
        ExtractorSet::new().with(LineExtractor {
            workers_created: Arc::default(),
        })
    }

    #[test]
    fn ingests_all_files() {
        let dir = setup(
            "wpdocs_ingest_all",
            &[("a.php", "alpha\nbeta\nhook init"), ("b.php", "gamma\nhook init")],
        );
        let set = extractors();
        let registry = Registry::new();
        let files = vec!["a.php".to_string(), "b.php".to_string()];

        let report = Ingestor::new(&set).workers(2).src_root(&dir).ingest(&files, &registry);

        assert_eq!(report.files_parsed, 2);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.symbols_emitted, 3);
        assert_eq!(report.hook_calls, 2);
        assert_eq!(registry.count(), 4);
        assert_eq!(registry.get("hook:init").unwrap().call_sites.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failures_are_isolated() {
        let dir = setup(
            "wpdocs_ingest_failures",
            &[
                ("good.php", "alpha"),
                ("bad.php", "fail"),
                ("boom.php", "panic"),
                ("notes.txt", "ignored"),
            ],
        );
        let set = extractors();
        let registry = Registry::new();
        let files: Vec<String> = ["good.php", "bad.php", "boom.php", "notes.txt", "missing.php"]
            .into_iter()
            .map(String::from)
            .collect();

        let report = Ingestor::new(&set).workers(3).src_root(&dir).ingest(&files, &registry);

        assert_eq!(report.files_total, 5);
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.files_failed, 4);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec!["bad.php", "boom.php", "missing.php", "notes.txt"]);
        assert!(registry.contains("alpha"));
        assert_eq!(registry.count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn worker_state_is_created_per_worker() {
        let dir = setup(
            "wpdocs_ingest_state",
            &[("a.php", "a"), ("b.php", "b"), ("c.php", "c"), ("d.php", "d")],
        );
        let created = Arc::new(AtomicUsize::new(0));
        let set = ExtractorSet::new().with(LineExtractor {
            workers_created: Arc::clone(&created),
        });
        let files: Vec<String> = ["a.php", "b.php", "c.php", "d.php"]
            .into_iter()
            .map(String::from)
            .collect();

        let registry = Registry::new();
        let report = Ingestor::new(&set).workers(1).src_root(&dir).ingest(&files, &registry);
        assert_eq!(report.files_parsed, 4);
        assert_eq!(created.load(Ordering::SeqCst), 1);

        created.store(0, Ordering::SeqCst);
        let registry = Registry::new();
        Ingestor::new(&set).workers(2).src_root(&dir).ingest(&files, &registry);
        let built = created.load(Ordering::SeqCst);
        assert!((1..=2).contains(&built), "built {built} extractor states");
        assert_eq!(registry.count(), 4);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cancelled_run_attempts_nothing() {
        let dir = setup("wpdocs_ingest_cancel", &[("a.php", "a"), ("b.php", "b")]);
        let set = extractors();
        let registry = Registry::new();
        let files = vec!["a.php".to_string(), "b.php".to_string()];

        let token = CancelToken::new();
        token.cancel();
        let report = Ingestor::new(&set)
            .workers(2)
            .src_root(&dir)
            .cancel_token(token)
            .ingest(&files, &registry);

        assert!(report.cancelled);
        assert_eq!(report.files_skipped, 2);
        assert_eq!(report.files_parsed, 0);
        assert!(registry.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn expired_deadline_cancels() {
        let token = CancelToken::with_deadline(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn unrepresentable_deadline_never_expires() {
        let token = CancelToken::with_deadline(Duration::from_secs(u64::MAX));
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn symbols_before_an_error_are_kept() {
        let dir = setup(
            "wpdocs_ingest_partial",
            &[("partial.php", "alpha\nhook init\nfail\nbeta")],
        );
        let set = extractors();
        let registry = Registry::new();
        let files = vec!["partial.php".to_string()];

        let report = Ingestor::new(&set).workers(1).src_root(&dir).ingest(&files, &registry);

        assert_eq!(report.files_parsed, 0);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.failures[0].path, "partial.php");
        assert_eq!(report.symbols_emitted, 1);
        assert!(registry.contains("alpha"));
        assert!(registry.contains("hook:init"));
        assert!(!registry.contains("beta"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_file_list_is_a_no_op() {
        let set = extractors();
        let registry = Registry::new();
        let report = Ingestor::new(&set).ingest(&[], &registry);
        assert_eq!(report.files_total, 0);
        assert!(!report.cancelled);
    }
}
