// File: wpsnapshots/src/operations/snapshots.rs
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{cache, export};
use crate::errors::{CacheError, SnapshotError, ValidationError};
use crate::services::cache::{partial_path, CacheDirectoryManager};
use crate::services::commands::{
    build_archive_command, build_export_command, ArgValue, Credentials, HostSpec,
};
use crate::services::process::ProcessRunner;
use crate::services::tables::{MysqlTableSource, TableSource};
use crate::services::{identifier, paths};
use crate::types::{Artifact, CacheEntry, DbConnection, SnapshotMeta, SnapshotRequest};

/// Assembles snapshots into the local cache.
pub struct SnapshotAssembler {
    config: Arc<Config>,
    cache: CacheDirectoryManager,
    runner: ProcessRunner,
    tables: Option<Arc<dyn TableSource>>,
}

impl SnapshotAssembler {
    pub fn new(config: Arc<Config>, cache: CacheDirectoryManager) -> Self {
        let runner = ProcessRunner::new(config.command_timeout());
        Self {
            config,
            cache,
            runner,
            tables: None,
        }
    }

    /// Use `tables` instead of querying the database with the mysql client.
    pub fn with_table_source(mut self, tables: Arc<dyn TableSource>) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn cache(&self) -> &CacheDirectoryManager {
        &self.cache
    }

    pub async fn create_snapshot(
        &self,
        request: SnapshotRequest,
    ) -> Result<CacheEntry, SnapshotError> {
        let request = request.validated()?;
        let source = paths::normalize(&request.path);

        if request.contains_files && !Path::new(&source).is_dir() {
            return Err(ValidationError::MissingSource { path: source }.into());
        }

        info!(
            "Starting snapshot for project {} from {} (db: {}, files: {})",
            request.project, source, request.contains_db, request.contains_files
        );

        // Step 1: Allocate a cache slot
        let id = identifier::generate();
        let slot = self.cache.ensure_slot(&id)?;
        let mut meta = SnapshotMeta::from_request(&id, &request, self.config.author());
        self.cache.write_meta(&meta)?;
        info!("✓ Cache slot {} allocated", slot.display());

        // Step 2: Database export
        if request.contains_db {
            let db = request
                .database
                .as_ref()
                .ok_or(ValidationError::MissingDatabase)?;
            let size = self.export_database(&request, db, &slot).await?;
            meta.db_size_bytes = Some(size);
            info!("✓ Database exported ({:.1} MB)", megabytes(size));
        }

        // Step 3: File archive
        if request.contains_files {
            let size = self.archive_files(&request, &source, &slot).await?;
            meta.files_size_bytes = Some(size);
            info!("✓ Files archived ({:.1} MB)", megabytes(size));
        }

        // Step 4: Record sizes and verify
        self.cache.write_meta(&meta)?;
        let artifacts = request.expected_artifacts();
        if !self.cache.is_complete(&id, &artifacts) {
            return Err(CacheError::Incomplete { id }.into());
        }

        info!("Snapshot {} created for {}", id, request.project);
        Ok(CacheEntry {
            id,
            path: slot,
            artifacts,
        })
    }

    async fn export_database(
        &self,
        request: &SnapshotRequest,
        db: &DbConnection,
        slot: &Path,
    ) -> Result<u64, SnapshotError> {
        let tables = match &self.tables {
            Some(source) => source.list_tables(&db.table_prefix).await?,
            None => {
                MysqlTableSource::new(&self.config.tools.mysql, db.clone(), self.runner.clone())
                    .list_tables(&db.table_prefix)
                    .await?
            }
        };
        if tables.is_empty() {
            warn!("No tables found with prefix {}, dumping the whole database", db.table_prefix);
        }

        let mut extra_args = vec![
            ("single-transaction".to_string(), ArgValue::Flag),
            ("quick".to_string(), ArgValue::Flag),
            ("lock-tables".to_string(), ArgValue::Value("false".to_string())),
        ];
        if request.small {
            extra_args.push((
                "where".to_string(),
                ArgValue::Value(format!("1 LIMIT {}", export::SMALL_ROW_LIMIT)),
            ));
        }

        let mut trailing = vec![db.name.clone()];
        trailing.extend(tables);

        let dump = slot.join(format!("data.sql{}", cache::PARTIAL_SUFFIX));
        let compressed = partial_path(&slot.join(Artifact::Database.file_name()));

        let spec = build_export_command(
            &self.config.tools.mysqldump,
            &HostSpec::parse(&db.host)?,
            &Credentials {
                user: db.user.clone(),
                password: db.password.clone(),
            },
            extra_args,
            trailing,
            Some(&dump),
        );

        if let Err(e) = self.runner.run(&spec, true).await {
            discard(&[dump.as_path()]);
            return Err(e.into());
        }

        let (src, dst) = (dump.clone(), compressed.clone());
        let compression = tokio::task::spawn_blocking(move || gzip_file(&src, &dst))
            .await
            .map_err(|e| SnapshotError::Other(format!("Compression task failed: {}", e)))?;
        discard(&[dump.as_path()]);

        let size = compression.map_err(|source| {
            discard(&[compressed.as_path()]);
            CacheError::WriteFailed {
                path: compressed.clone(),
                source,
            }
        })?;

        promote(&compressed, &slot.join(Artifact::Database.file_name()))?;
        Ok(size)
    }

    async fn archive_files(
        &self,
        request: &SnapshotRequest,
        source: &str,
        slot: &Path,
    ) -> Result<u64, SnapshotError> {
        let target = slot.join(Artifact::Files.file_name());
        let partial = partial_path(&target);

        let spec = build_archive_command(
            &self.config.tools.tar,
            Path::new(source),
            &partial,
            &request.exclude_paths,
        );

        if let Err(e) = self.runner.run(&spec, true).await {
            discard(&[partial.as_path()]);
            return Err(e.into());
        }

        let size = file_size(&partial)?;
        promote(&partial, &target)?;
        Ok(size)
    }
}

fn gzip_file(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut input = File::open(src)?;
    let mut encoder = GzEncoder::new(File::create(dst)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let file = encoder.finish()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn file_size(path: &Path) -> Result<u64, CacheError> {
    std::fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|source| CacheError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Move a finished partial file to its final artifact name.
fn promote(partial: &Path, target: &Path) -> Result<(), CacheError> {
    std::fs::rename(partial, target).map_err(|source| {
        discard(&[partial]);
        CacheError::WriteFailed {
            path: target.to_path_buf(),
            source,
        }
    })
}

fn discard(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
