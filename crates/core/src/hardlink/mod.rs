//! Hard-link lookup collaborator.
//!
//! The engine only records the boolean; the stat work lives here so a
//! failure (or the feature being disabled) degrades to "not hardlinked"
//! without touching classification.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;
use walkdir::WalkDir;

/// Answers "is this content path hard-linked somewhere else?".
pub trait HardlinkChecker: Send + Sync {
    fn is_hardlinked(&self, path: &str) -> bool;
}

/// Checker used when hard-link tagging is disabled; always answers no.
#[derive(Debug, Default)]
pub struct DisabledHardlinkChecker;

impl HardlinkChecker for DisabledHardlinkChecker {
    fn is_hardlinked(&self, _path: &str) -> bool {
        false
    }
}

/// Stat-based checker with a per-run cache.
///
/// A path counts as hard-linked when any regular file under it has a
/// link count above 1. Stat failures answer false.
#[derive(Debug, Default)]
pub struct FsHardlinkChecker {
    cache: Mutex<HashMap<String, bool>>,
}

impl FsHardlinkChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(path: &str) -> bool {
        let root = Path::new(path);
        if !root.exists() {
            debug!("Hard-link check skipped, path does not exist: {}", path);
            return false;
        }

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => {
                    if nlink(&metadata) > 1 {
                        return true;
                    }
                }
                Err(e) => {
                    debug!("Hard-link stat failed for {:?}: {}", entry.path(), e);
                }
            }
        }
        false
    }
}

impl HardlinkChecker for FsHardlinkChecker {
    fn is_hardlinked(&self, path: &str) -> bool {
        if let Ok(cache) = self.cache.lock() {
            if let Some(cached) = cache.get(path) {
                return *cached;
            }
        }

        let result = Self::check(path);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(path.to_string(), result);
        }
        result
    }
}

#[cfg(unix)]
fn nlink(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn nlink(_metadata: &std::fs::Metadata) -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_disabled_checker_answers_false() {
        let checker = DisabledHardlinkChecker;
        assert!(!checker.is_hardlinked("/anything"));
    }

    #[test]
    fn test_missing_path_answers_false() {
        let checker = FsHardlinkChecker::new();
        assert!(!checker.is_hardlinked("/nonexistent/keelhaul/path"));
    }

    #[cfg(unix)]
    #[test]
    fn test_detects_hard_linked_file() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        fs::create_dir(&content).unwrap();
        let file = content.join("release.mkv");
        fs::write(&file, b"data").unwrap();

        let checker = FsHardlinkChecker::new();
        let content_str = content.to_str().unwrap();
        assert!(!checker.is_hardlinked(content_str));

        // Link it into a "library" and re-check with a fresh cache.
        fs::hard_link(&file, dir.path().join("library.mkv")).unwrap();
        let checker = FsHardlinkChecker::new();
        assert!(checker.is_hardlinked(content_str));
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_returns_first_answer() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        fs::create_dir(&content).unwrap();
        let file = content.join("release.mkv");
        fs::write(&file, b"data").unwrap();

        let checker = FsHardlinkChecker::new();
        let content_str = content.to_str().unwrap();
        assert!(!checker.is_hardlinked(content_str));

        // Linking after the first lookup does not change the cached
        // answer within the same run.
        fs::hard_link(&file, dir.path().join("library.mkv")).unwrap();
        assert!(!checker.is_hardlinked(content_str));
    }
}
