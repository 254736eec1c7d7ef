//! wpdocs-index: Symbol registry and cross-reference resolution for wpdocs.
//!
//! Ingests per-file extraction output into a shared registry with a pool of
//! workers, then resolves name references (inheritance, hook tags, `@see`
//! links, method overrides) into symbol IDs.
//!
//! # Architecture
//!
//! - **registry** — Concurrent store indexed by ID, kind and file; hook upsert
//! - **extractor** — Traits at the boundary to per-language extractors
//! - **records** — Extractor that replays JSON extraction records
//! - **ingest** — Worker pool draining a file queue into the registry
//! - **resolver** — Four ordered resolution passes over a closed registry
//! - **source** — Local source tree validation, version detection and file discovery

pub mod extractor;
pub mod ingest;
pub mod records;
pub mod registry;
pub mod resolver;
pub mod source;

pub use extractor::{CollectingSink, ExtractorSet, FileExtractor, LanguageExtractor, SymbolSink};
pub use ingest::{CancelToken, FileFailure, IngestReport, Ingestor};
pub use records::{FileRecord, RecordExtractor};
pub use registry::{HookUpsert, Registry};
pub use resolver::{clean_see_reference, ResolveStats, Resolver, SymbolLookup};
pub use source::{detect_version, find_files, SourceTree};
