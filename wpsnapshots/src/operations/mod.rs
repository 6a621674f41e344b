// File: wpsnapshots/src/operations/mod.rs
pub mod provision;
pub mod snapshots;
