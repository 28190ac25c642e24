// src/config/mod.rs

//! Configuration for fileshipper.
//!
//! Responsibilities:
//! - Define the TOML-backed data model with compiled defaults (`model.rs`).
//! - Load an optional config file from disk (`loader.rs`).
//! - Validate limits that serde cannot check (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, TransferSection, TransportSection, WatchSection, MAX_SUPPORTED_DEPTH,
};
pub use validate::validate_config;
