//! JSON extraction records.
//!
//! External grammar walkers write one `FileRecord` per source file. The
//! [`RecordExtractor`] replays those records through the normal ingestion
//! pipeline, so the registry and resolver can run without linking a parser.

use crate::extractor::{FileExtractor, LanguageExtractor, SymbolSink};
use serde::{Deserialize, Serialize};
use wpdocs_core::{HookCall, Symbol, SymbolKind, WpdocsError};

/// Extraction output for one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    /// Source file the record was produced from, relative to the source root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub symbols: Vec<Symbol>,
    pub hook_calls: Vec<HookCall>,
    /// Set when the external extractor failed on this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reads `*.json` extraction records.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordExtractor;

impl LanguageExtractor for RecordExtractor {
    fn language_name(&self) -> &str {
        "records"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn new_worker(&self) -> Box<dyn FileExtractor + '_> {
        Box::new(RecordWorker)
    }
}

struct RecordWorker;

impl FileExtractor for RecordWorker {
    fn extract_file(
        &mut self,
        path: &str,
        source: &[u8],
        sink: &mut dyn SymbolSink,
    ) -> Result<(), WpdocsError> {
        let record: FileRecord = serde_json::from_slice(source)?;
        if let Some(err) = record.error {
            let file = record.file.as_deref().unwrap_or(path);
            return Err(WpdocsError::Extraction(format!("{file}: {err}")));
        }

        for symbol in record.symbols {
            // Hooks only enter the registry through the merging path.
            if symbol.kind == SymbolKind::Hook {
                tracing::debug!("{path}: ignoring pre-built hook symbol {}", symbol.id);
                continue;
            }
            sink.emit(symbol);
        }
        for call in record.hook_calls {
            sink.emit_hook_call(call);
        }
        Ok(())
    }
}
