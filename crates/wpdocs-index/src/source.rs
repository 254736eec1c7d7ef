//! Local source tree discovery.
//!
//! Validates a checkout, detects its version and lists the files to queue
//! for ingestion. Fetching a tree from a remote is left to the caller.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use wpdocs_core::WpdocsError;

/// Marker directory every source tree must contain.
const CORE_DIR: &str = "wp-includes";

/// A validated source tree.
#[derive(Debug, Clone)]
pub struct SourceTree {
    pub path: PathBuf,
    pub version: String,
}

impl SourceTree {
    /// Open a local checkout. A tag of `latest` means "read the version from
    /// the tree itself"; any other tag is taken as the version verbatim.
    pub fn open(path: &Path, tag: &str) -> Result<Self, WpdocsError> {
        if !path.join(CORE_DIR).is_dir() {
            return Err(WpdocsError::Source(format!(
                "{} doesn't look like a WordPress source tree: missing {CORE_DIR}",
                path.display()
            )));
        }

        let version = if tag == "latest" {
            detect_version(path)
        } else {
            tag.to_string()
        };

        Ok(Self {
            path: path.to_path_buf(),
            version,
        })
    }

    /// Files under the tree with one of `extensions`, relative to the root.
    pub fn find_files(&self, extensions: &[String], skip_dirs: &[String]) -> Vec<String> {
        find_files(&self.path, extensions, skip_dirs)
    }
}

/// Read `$wp_version = '6.7.1';` from `wp-includes/version.php`.
pub fn detect_version(root: &Path) -> String {
    let Ok(content) = std::fs::read_to_string(root.join(CORE_DIR).join("version.php")) else {
        return "unknown".to_string();
    };

    content
        .lines()
        .filter(|line| line.contains("$wp_version ="))
        .find_map(|line| line.split('\'').nth(1))
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Walk `root` and return the sorted relative paths of files whose
/// extension (case-insensitive) is in `extensions`. Directories named in
/// `skip_dirs` are not descended into.
pub fn find_files(root: &Path, extensions: &[String], skip_dirs: &[String]) -> Vec<String> {
    let skip: Vec<String> = skip_dirs.to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip.iter().any(|s| s == name.as_ref())
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("Walk error: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            continue;
        }

        if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_string_lossy().into_owned());
        }
    }

    files.sort();
    tracing::debug!("Found {} files under {}", files.len(), root.display());
    files
}
