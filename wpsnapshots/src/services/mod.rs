// File: wpsnapshots/src/services/mod.rs
pub mod cache;
pub mod commands;
pub mod config_editor;
pub mod download;
pub mod identifier;
pub mod paths;
pub mod process;
pub mod tables;
