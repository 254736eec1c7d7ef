//! Extractor boundary: per-language producers of symbol records.
//!
//! Grammar walking lives outside this crate. An extractor hands each symbol
//! and hook-firing event to a [`SymbolSink`] as soon as it is found; the
//! ingestion pipeline backs the sink with the shared registry.

use std::path::Path;
use wpdocs_core::{HookCall, Symbol, WpdocsError};

/// Receives extraction output for one file.
pub trait SymbolSink {
    /// A fully populated symbol (anything but a hook).
    fn emit(&mut self, symbol: Symbol);

    /// One call that fires a hook; merged by tag.
    fn emit_hook_call(&mut self, call: HookCall);
}

/// Per-worker extraction state (a reusable parser, scratch buffers).
///
/// Created once per worker by [`LanguageExtractor::new_worker`] and never
/// shared between workers.
pub trait FileExtractor {
    /// Extract everything defined in one file.
    ///
    /// `path` is relative to the source root. Symbols already emitted when
    /// an error is returned stay in the registry.
    fn extract_file(
        &mut self,
        path: &str,
        source: &[u8],
        sink: &mut dyn SymbolSink,
    ) -> Result<(), WpdocsError>;
}

/// Trait for per-language symbol extraction.
pub trait LanguageExtractor: Send + Sync {
    /// Returns the language name recorded on symbols (e.g., "php", "js").
    fn language_name(&self) -> &str;

    /// Returns the file extensions this extractor handles (e.g., &["php"]).
    fn file_extensions(&self) -> &[&str];

    /// Create fresh per-worker state.
    fn new_worker(&self) -> Box<dyn FileExtractor + '_>;
}

/// Dispatches files to extractors by extension.
#[derive(Default)]
pub struct ExtractorSet {
    extractors: Vec<Box<dyn LanguageExtractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extractor. Earlier registrations win on extension clashes.
    pub fn with(mut self, extractor: impl LanguageExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Returns the list of all supported file extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.extractors
            .iter()
            .flat_map(|e| e.file_extensions().iter().copied())
            .collect()
    }

    /// Index of the extractor handling `path`, matched case-insensitively
    /// on the extension.
    pub fn position_for(&self, path: &str) -> Option<usize> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        self.position(&ext)
    }

    pub fn get(&self, index: usize) -> Option<&dyn LanguageExtractor> {
        self.extractors.get(index).map(|e| e.as_ref())
    }

    fn position(&self, ext: &str) -> Option<usize> {
        self.extractors
            .iter()
            .position(|e| e.file_extensions().contains(&ext))
    }
}

/// A sink that buffers output; useful for running an extractor in isolation.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub symbols: Vec<Symbol>,
    pub hook_calls: Vec<HookCall>,
}

impl SymbolSink for CollectingSink {
    fn emit(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    fn emit_hook_call(&mut self, call: HookCall) {
        self.hook_calls.push(call);
    }
}
