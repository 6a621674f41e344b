// File: wpsnapshots/src/lib.rs
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod operations;
pub mod services;
pub mod types;

pub use errors::SnapshotError;
pub use operations::snapshots::SnapshotAssembler;
pub use types::{Artifact, CacheEntry, SnapshotRequest};
