//! `wpdocs files` and `wpdocs resolve`: discovery, ingestion and resolution.

use colored::Colorize;
use std::path::Path;
use std::time::{Duration, Instant};
use wpdocs_core::{SymbolKind, WpdocsConfig};
use wpdocs_index::{
    find_files, CancelToken, ExtractorSet, IngestReport, Ingestor, RecordExtractor, Registry,
    ResolveStats, Resolver, SourceTree,
};

pub(crate) fn cmd_files(
    config: &WpdocsConfig,
    source: &Path,
    tag: &str,
    skip_php: bool,
    skip_js: bool,
) -> anyhow::Result<()> {
    if skip_php && skip_js {
        anyhow::bail!("Nothing to list: both --skip-php and --skip-js were given");
    }

    let tree = SourceTree::open(source, tag)?;
    eprintln!("Source: {} (version {})", tree.path.display(), tree.version);

    let mut extensions = Vec::new();
    if !skip_php {
        extensions.extend(config.index.php_extensions.iter().cloned());
    }
    if !skip_js {
        extensions.extend(config.index.js_extensions.iter().cloned());
    }

    let files = tree.find_files(&extensions, &config.index.skip_dirs);
    for file in &files {
        println!("{file}");
    }
    eprintln!("{} files", files.len());
    Ok(())
}

pub(crate) fn cmd_resolve(
    config: &WpdocsConfig,
    records: &Path,
    dump: Option<&Path>,
    verbose: bool,
) -> anyhow::Result<()> {
    if !records.is_dir() {
        anyhow::bail!("Records directory not found: {}", records.display());
    }

    let start = Instant::now();
    let extractors = ExtractorSet::new().with(RecordExtractor);
    let extensions: Vec<String> = extractors
        .supported_extensions()
        .into_iter()
        .map(String::from)
        .collect();
    let files = find_files(records, &extensions, &config.index.skip_dirs);
    if files.is_empty() {
        anyhow::bail!("No extraction records under {}", records.display());
    }
    tracing::info!("Found {} extraction records under {}", files.len(), records.display());

    let token = match config.index.deadline_secs {
        Some(secs) => CancelToken::with_deadline(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };

    let mut registry = Registry::new();
    let report = Ingestor::new(&extractors)
        .workers(config.index.workers)
        .src_root(records)
        .cancel_token(token)
        .ingest(&files, &registry);

    let stats = Resolver::from_config(&config.resolver).resolve_all(&mut registry);

    print_ingest(&report, verbose);
    print_registry(&registry);
    print_stats(&stats);
    println!("  Elapsed:        {:.2?}", start.elapsed());

    if let Some(path) = dump {
        let json = serde_json::to_vec_pretty(&registry.all())?;
        std::fs::write(path, json)?;
        eprintln!("Wrote {} symbols to {}", registry.count(), path.display());
    }

    if report.cancelled {
        eprintln!(
            "{} deadline reached, {} files were not attempted",
            "Warning:".yellow().bold(),
            report.files_skipped
        );
    }
    Ok(())
}

fn print_ingest(report: &IngestReport, verbose: bool) {
    println!("{}", "Ingestion".bold());
    println!("  Files queued:   {}", report.files_total);
    println!("  Files parsed:   {}", report.files_parsed);
    println!("  Files failed:   {}", report.files_failed);
    if report.files_skipped > 0 {
        println!("  Files skipped:  {}", report.files_skipped);
    }
    println!("  Symbols:        {}", report.symbols_emitted);
    println!("  Hook calls:     {}", report.hook_calls);

    if verbose {
        for failure in &report.failures {
            println!("    {} {}: {}", "x".red(), failure.path, failure.error);
        }
    }
    println!();
}

fn print_registry(registry: &Registry) {
    println!("{}", "Registry".bold());
    println!("  Total symbols:  {}", registry.count());
    println!("  PHP symbols:    {}", registry.count_by_language("php"));
    println!("  JS symbols:     {}", registry.count_by_language("js"));
    for kind in SymbolKind::ALL {
        let count = registry.count_by_kind(kind);
        if count > 0 {
            println!("    {:<14}{count}", format!("{kind}:"));
        }
    }
    println!();
}

fn print_stats(stats: &ResolveStats) {
    println!("{}", "Resolution".bold());
    println!("  Resolved:       {}", stats.resolved);
    println!("  Unresolved:     {}", stats.unresolved);
    println!("  Inheritance:    {}", stats.inheritance);
    println!("  Hook bindings:  {}", stats.hook_bindings);
    println!("  Overrides:      {}", stats.overrides);
}
