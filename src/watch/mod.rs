// src/watch/mod.rs

//! Directory watching and backfill.
//!
//! This module is responsible for:
//! - Tracking which directory is live at each depth (`table`).
//! - Talking to the change-notification facility (`facility`,
//!   `notify_backend`).
//! - Walking existing directories in a deterministic order (`scanner`).
//!
//! It does not know about the wire protocol; completed files are handed to a
//! [`crate::transport::FileSink`].

pub mod facility;
pub mod notify_backend;
pub mod path_utils;
pub mod scanner;
pub mod table;

pub use facility::{WatchEvent, WatchEventKind, WatchFacility, WatchHandle};
pub use notify_backend::NotifyFacility;
pub use path_utils::ScanLimits;
pub use scanner::{DirectoryScanner, Listing, ScanContext};
pub use table::{Reroot, WatchSlot, WatchTable};
