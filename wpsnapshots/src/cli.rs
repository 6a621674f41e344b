// File: wpsnapshots/src/cli.rs
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::constants::{cache, export};
use crate::operations::provision::{ProvisionRequest, Provisioner};
use crate::operations::snapshots::SnapshotAssembler;
use crate::services::config_editor::ConfigValue;
use crate::services::download::DownloadUrlResolver;
use crate::types::{DbConnection, SnapshotMeta, SnapshotRequest};

#[derive(Parser, Debug)]
#[command(name = "wpsnapshots", version, about = "Create and cache WordPress snapshots")]
pub struct Cli {
    /// Config file; defaults to config.toml in the cache root
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export the database and files of a site into the local cache
    Create(CreateArgs),
    /// Check whether a cached snapshot has all of its artifacts
    Status { id: String },
    /// List cached snapshots, newest first
    List {
        #[arg(long)]
        project: Option<String>,
    },
    /// Print the archive URL for a WordPress version
    DownloadUrl {
        version: String,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Download WordPress and write wp-config.php
    Provision(ProvisionArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub description: String,
    /// WordPress root to archive
    #[arg(long, default_value = ".")]
    pub path: String,
    #[arg(long, default_value = "localhost")]
    pub db_host: String,
    #[arg(long, default_value = "root")]
    pub db_user: String,
    #[arg(long, env = "WPSNAPSHOTS_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,
    #[arg(long)]
    pub db_name: Option<String>,
    #[arg(long, default_value = export::DEFAULT_TABLE_PREFIX)]
    pub table_prefix: String,
    #[arg(long)]
    pub no_db: bool,
    #[arg(long)]
    pub no_files: bool,
    /// Path relative to the WordPress root to leave out; repeatable
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
    /// Limit every table to a handful of rows
    #[arg(long)]
    pub small: bool,
    #[arg(long)]
    pub no_scrub: bool,
    #[arg(long)]
    pub repository: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[arg(default_value = "latest")]
    pub version: String,
    #[arg(long)]
    pub locale: Option<String>,
    #[arg(long, default_value = ".")]
    pub target: String,
    /// wp-config.php template to rewrite into the target directory
    #[arg(long)]
    pub template: Option<String>,
    /// NAME=VALUE constant for wp-config.php; repeatable
    #[arg(long = "define", value_parser = parse_define)]
    pub defines: Vec<(String, ConfigValue)>,
}

impl CreateArgs {
    pub fn into_request(self, config: &Config) -> Result<SnapshotRequest> {
        let contains_db = !self.no_db;
        let database = if contains_db {
            let name = self
                .db_name
                .ok_or_else(|| anyhow!("--db-name is required unless --no-db is given"))?;
            Some(DbConnection {
                host: self.db_host,
                user: self.db_user,
                password: self.db_password,
                name,
                table_prefix: self.table_prefix,
            })
        } else {
            None
        };

        Ok(SnapshotRequest {
            project: self.project,
            description: self.description,
            path: self.path,
            database,
            contains_db,
            contains_files: !self.no_files,
            exclude_paths: self.exclude.into_iter().collect::<BTreeSet<_>>(),
            small: self.small,
            no_scrub: self.no_scrub,
            repository: self
                .repository
                .unwrap_or_else(|| config.default_repository.clone()),
        })
    }
}

fn parse_define(raw: &str) -> Result<(String, ConfigValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing constant name in '{}'", raw));
    }
    Ok((name.to_string(), ConfigValue::parse_loose(value)))
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load(path).await?,
            None => Config::load_default().await?,
        };
        let config = Arc::new(config);

        match self.command {
            Command::Create(args) => create(config, args).await,
            Command::Status { id } => status(&config, &id),
            Command::List { project } => list(&config, project.as_deref()),
            Command::DownloadUrl { version, locale } => {
                let resolver = DownloadUrlResolver::new(&config.version_check_url)?;
                let locale = locale.unwrap_or_else(|| config.locale.clone());
                println!("{}", resolver.resolve(&version, &locale).await?);
                Ok(())
            }
            Command::Provision(args) => provision(&config, args).await,
        }
    }
}

async fn create(config: Arc<Config>, args: CreateArgs) -> Result<()> {
    let request = args.into_request(&config)?;
    let cache = config.cache()?;
    let assembler = SnapshotAssembler::new(config, cache);
    let entry = assembler.create_snapshot(request).await?;

    println!("{}", entry.id);
    for artifact in &entry.artifacts {
        info!("  {}", entry.artifact_path(*artifact).display());
    }
    Ok(())
}

fn status(config: &Config, id: &str) -> Result<()> {
    let cache = config.cache()?;
    let meta = cache
        .read_meta(id)
        .with_context(|| format!("Snapshot {} is not in the local cache", id))?;
    let complete = cache.is_cached(id);

    println!("{}", describe(&meta));
    println!("complete: {}", if complete { "yes" } else { "no" });
    if !complete {
        return Err(anyhow!("Snapshot {} is incomplete", id));
    }
    Ok(())
}

fn list(config: &Config, project: Option<&str>) -> Result<()> {
    let cache = config.cache()?;
    let entries = match project {
        Some(project) => cache.search(&project.to_lowercase())?,
        None => cache.list()?,
    };
    if entries.is_empty() {
        info!("No snapshots in {}", cache.root().display());
    }
    for meta in &entries {
        println!("{}", describe(meta));
    }
    Ok(())
}

async fn provision(config: &Config, args: ProvisionArgs) -> Result<()> {
    let resolver = DownloadUrlResolver::new(&config.version_check_url)?;
    let request = ProvisionRequest {
        version: args.version,
        locale: args.locale.unwrap_or_else(|| config.locale.clone()),
        target_dir: PathBuf::from(crate::services::paths::normalize(&args.target)),
        config_template: args
            .template
            .map(|template| PathBuf::from(crate::services::paths::normalize(&template))),
        constants: args.defines,
    };

    let outcome = Provisioner::new(resolver).prepare_environment(&request).await?;
    println!("{}", outcome.archive.display());
    if let Some(config_path) = outcome.config {
        println!("{}", config_path.display());
    }
    Ok(())
}

fn describe(meta: &SnapshotMeta) -> String {
    let mut contents = Vec::new();
    if meta.contains_db {
        contents.push(cache::DB_ARTIFACT);
    }
    if meta.contains_files {
        contents.push(cache::FILES_ARTIFACT);
    }
    format!(
        "{}  {}/{}  {}  {}  [{}]",
        meta.id,
        meta.repository,
        meta.project,
        meta.created_at.format("%Y-%m-%d %H:%M"),
        meta.description,
        contents.join(", ")
    )
}
