// File: wpsnapshots/src/services/cache.rs
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, info, warn};

use crate::constants::cache;
use crate::errors::{CacheError, ValidationError};
use crate::services::paths;
use crate::types::{Artifact, SnapshotMeta};

const WRITE_PROBE: &str = ".write-probe";

/// Owns the on-disk snapshot cache: `{root}/{id}/{artifact}`.
#[derive(Debug, Clone)]
pub struct CacheDirectoryManager {
    root: PathBuf,
}

impl CacheDirectoryManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at `$WPSNAPSHOTS_DIR`, or `~/.wpsnapshots` when unset.
    pub fn from_env() -> Option<Self> {
        default_root().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, id: &str) -> Result<PathBuf, ValidationError> {
        validate_slot_name(id)?;
        Ok(self.root.join(id))
    }

    pub fn ensure_root(&self) -> Result<PathBuf, CacheError> {
        if !self.root.is_dir() {
            info!("Creating snapshot cache at {}", self.root.display());
            create_private_dir(&self.root)?;
        }
        check_writable(&self.root)?;
        Ok(self.root.clone())
    }

    pub fn ensure_slot(&self, id: &str) -> Result<PathBuf, CacheError> {
        let slot = self.slot_path(id)?;
        self.ensure_root()?;
        if !slot.is_dir() {
            debug!("Creating cache slot {}", slot.display());
            create_private_dir(&slot)?;
        }
        check_writable(&slot)?;
        Ok(slot)
    }

    /// True iff every expected artifact exists as a file in the slot.
    ///
    /// A missing slot, an invalid id or an empty expectation set all report
    /// `false`.
    pub fn is_complete(&self, id: &str, expected: &[Artifact]) -> bool {
        if expected.is_empty() {
            return false;
        }
        let Ok(slot) = self.slot_path(id) else {
            return false;
        };
        expected
            .iter()
            .all(|artifact| slot.join(artifact.file_name()).is_file())
    }

    /// Completeness check driven by the slot's own metadata.
    pub fn is_cached(&self, id: &str) -> bool {
        match self.read_meta(id) {
            Ok(meta) => self.is_complete(id, &meta.expected_artifacts()),
            Err(e) => {
                debug!("No usable metadata for {}: {}", id, e);
                false
            }
        }
    }

    pub fn write_meta(&self, meta: &SnapshotMeta) -> Result<PathBuf, CacheError> {
        let slot = self.slot_path(&meta.id)?;
        let path = slot.join(cache::META_FILE);
        let body = serde_json::to_vec_pretty(meta).map_err(|e| CacheError::InvalidMeta {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &body)?;
        Ok(path)
    }

    pub fn read_meta(&self, id: &str) -> Result<SnapshotMeta, CacheError> {
        let path = self.slot_path(id)?.join(cache::META_FILE);
        read_meta_file(&path)
    }

    /// Every snapshot with readable metadata, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotMeta>, CacheError> {
        let pattern = format!(
            "{}/*/{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            cache::META_FILE
        );
        let entries = glob(&pattern).map_err(|e| CacheError::InvalidMeta {
            path: self.root.clone(),
            reason: e.to_string(),
        })?;

        let mut snapshots = Vec::new();
        for entry in entries.flatten() {
            match read_meta_file(&entry) {
                Ok(meta) => snapshots.push(meta),
                Err(e) => warn!("Skipping unreadable snapshot metadata: {}", e),
            }
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }

    /// Snapshots belonging to `project`, newest first.
    pub fn search(&self, project: &str) -> Result<Vec<SnapshotMeta>, CacheError> {
        let project = project.trim().to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|meta| meta.project == project)
            .collect())
    }
}

pub fn default_root() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(cache::ROOT_ENV_VAR) {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(paths::normalize(&dir)));
        }
    }
    paths::home_dir().map(|home| home.join(cache::ROOT_DIR_NAME))
}

fn validate_slot_name(id: &str) -> Result<(), ValidationError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_whitespace);
    if invalid {
        return Err(ValidationError::InvalidIdentifier { id: id.to_string() });
    }
    Ok(())
}

fn create_private_dir(path: &Path) -> Result<(), CacheError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).map_err(|source| CacheError::CreateFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn check_writable(dir: &Path) -> Result<(), CacheError> {
    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, b"")
        .and_then(|_| fs::remove_file(&probe))
        .map_err(|source| CacheError::NotWritable {
            path: dir.to_path_buf(),
            source,
        })
}

/// Write `body` next to `path` and rename it into place.
pub(crate) fn write_atomic(path: &Path, body: &[u8]) -> Result<(), CacheError> {
    let partial = partial_path(path);
    fs::write(&partial, body)
        .and_then(|_| fs::rename(&partial, path))
        .map_err(|source| {
            let _ = fs::remove_file(&partial);
            CacheError::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(cache::PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn read_meta_file(path: &Path) -> Result<SnapshotMeta, CacheError> {
    let raw = fs::read(path).map_err(|source| CacheError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|e| CacheError::InvalidMeta {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn manager() -> (TempDir, CacheDirectoryManager) {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectoryManager::new(dir.path().join("cache"));
        (dir, cache)
    }

    fn meta(id: &str, project: &str, contains_files: bool) -> SnapshotMeta {
        SnapshotMeta {
            id: id.to_string(),
            project: project.to_string(),
            description: "test".to_string(),
            repository: "10up".to_string(),
            author: None,
            contains_db: true,
            contains_files,
            small: false,
            scrub_requested: true,
            created_at: Utc::now(),
            db_size_bytes: None,
            files_size_bytes: None,
        }
    }

    #[test]
    fn test_ensure_root_creates_private_directory() {
        let (_dir, cache) = manager();
        let root = cache.ensure_root().unwrap();
        assert!(root.is_dir());
        assert!(!root.join(WRITE_PROBE).exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&root).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }

        // idempotent
        cache.ensure_root().unwrap();
    }

    #[test]
    fn test_ensure_slot_creates_id_directory() {
        let (_dir, cache) = manager();
        let slot = cache.ensure_slot("abc123").unwrap();
        assert_eq!(slot, cache.root().join("abc123"));
        assert!(slot.is_dir());
    }

    #[test]
    fn test_ensure_slot_rejects_path_traversal() {
        let (_dir, cache) = manager();
        for id in ["", "..", "a/b", "a\\b", "with space"] {
            assert!(
                matches!(cache.ensure_slot(id), Err(CacheError::InvalidSlot(_))),
                "id {:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_completeness_transitions() {
        let (_dir, cache) = manager();
        let expected = [Artifact::Database, Artifact::Files];

        assert!(!cache.is_complete("missing", &expected));

        let slot = cache.ensure_slot("snap").unwrap();
        assert!(!cache.is_complete("snap", &expected));

        fs::write(slot.join("data.sql.gz"), b"db").unwrap();
        assert!(!cache.is_complete("snap", &expected));

        fs::write(slot.join("files.tar.gz"), b"files").unwrap();
        assert!(cache.is_complete("snap", &expected));

        fs::remove_file(slot.join("data.sql.gz")).unwrap();
        assert!(!cache.is_complete("snap", &expected));
    }

    #[test]
    fn test_partial_artifact_is_not_complete() {
        let (_dir, cache) = manager();
        let slot = cache.ensure_slot("snap").unwrap();
        fs::write(slot.join("data.sql.gz.partial"), b"half").unwrap();
        assert!(!cache.is_complete("snap", &[Artifact::Database]));
    }

    #[test]
    fn test_directory_named_like_artifact_is_not_complete() {
        let (_dir, cache) = manager();
        let slot = cache.ensure_slot("snap").unwrap();
        fs::create_dir(slot.join("data.sql.gz")).unwrap();
        assert!(!cache.is_complete("snap", &[Artifact::Database]));
    }

    #[test]
    fn test_empty_expectation_is_never_complete() {
        let (_dir, cache) = manager();
        cache.ensure_slot("snap").unwrap();
        assert!(!cache.is_complete("snap", &[]));
    }

    #[test]
    fn test_is_cached_uses_metadata_scope() {
        let (_dir, cache) = manager();
        let slot = cache.ensure_slot("dbonly").unwrap();
        cache.write_meta(&meta("dbonly", "blog", false)).unwrap();
        assert!(!cache.is_cached("dbonly"));

        fs::write(slot.join("data.sql.gz"), b"db").unwrap();
        assert!(cache.is_cached("dbonly"));
        assert!(!cache.is_cached("unknown"));
    }

    #[test]
    fn test_meta_round_trip_leaves_no_partial_file() {
        let (_dir, cache) = manager();
        let slot = cache.ensure_slot("snap").unwrap();
        let written = meta("snap", "blog", true);
        cache.write_meta(&written).unwrap();

        assert_eq!(cache.read_meta("snap").unwrap(), written);
        assert!(!slot.join("meta.json.partial").exists());
    }

    #[test]
    fn test_list_and_search_sort_newest_first() {
        let (_dir, cache) = manager();
        let mut older = meta("older", "blog", true);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = meta("newer", "blog", true);
        let other = meta("other", "shop", true);
        for m in [&older, &newer, &other] {
            cache.ensure_slot(&m.id).unwrap();
            cache.write_meta(m).unwrap();
        }
        // slot without metadata is ignored
        cache.ensure_slot("bare").unwrap();

        let all = cache.list().unwrap();
        assert_eq!(all.len(), 3);

        let blog: Vec<_> = cache
            .search("BLOG")
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(blog, vec!["newer".to_string(), "older".to_string()]);
    }

    #[test]
    fn test_root_that_is_a_file_cannot_be_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cache");
        fs::write(&root, b"not a directory").unwrap();
        let cache = CacheDirectoryManager::new(&root);

        assert!(matches!(
            cache.ensure_root(),
            Err(CacheError::CreateFailed { .. })
        ));
        assert!(matches!(
            cache.ensure_slot("abc123"),
            Err(CacheError::CreateFailed { .. })
        ));
        assert!(root.is_file());
        assert!(!root.join("abc123").exists());
    }

    #[test]
    fn test_root_below_a_file_cannot_be_created() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), b"").unwrap();
        let cache = CacheDirectoryManager::new(dir.path().join("blocker/cache"));

        let err = cache.ensure_slot("abc123").unwrap_err();
        assert!(matches!(err, CacheError::CreateFailed { ref path, .. } if path == cache.root()));
    }

    #[test]
    fn test_slot_that_is_a_file_cannot_be_created() {
        let (_dir, cache) = manager();
        cache.ensure_root().unwrap();
        fs::write(cache.root().join("abc123"), b"").unwrap();

        assert!(matches!(
            cache.ensure_slot("abc123"),
            Err(CacheError::CreateFailed { .. })
        ));
        assert!(!cache.root().join("abc123").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_root_is_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, cache) = manager();
        let root = cache.ensure_root().unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o500)).unwrap();

        // root bypasses directory permissions
        if fs::write(root.join("probe"), b"").is_ok() {
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let result = cache.ensure_root();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o700)).unwrap();
        assert!(matches!(result, Err(CacheError::NotWritable { .. })));
    }

    #[test]
    fn test_unreadable_meta_reports_read_failure() {
        let (_dir, cache) = manager();
        cache.ensure_slot("abc123").unwrap();
        // a directory where the metadata file should be
        fs::create_dir(cache.root().join("abc123").join(cache::META_FILE)).unwrap();

        let err = cache.read_meta("abc123").unwrap_err();
        assert!(matches!(err, CacheError::ReadFailed { .. }));
        assert!(err.to_string().starts_with("failed to read"));
    }

    #[test]
    fn test_list_on_missing_root_is_empty() {
        let (_dir, cache) = manager();
        assert!(cache.list().unwrap().is_empty());
    }
}
