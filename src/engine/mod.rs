// src/engine/mod.rs

//! The daemon's control loop.
//!
//! This module ties together:
//! - the watch table and backfill scanner (directory side)
//! - the file sink (transport side)
//! - the notification facility's event stream
//! - cooperative shutdown
//!
//! Individual event reactions live in [`event_handlers`]; the loop that
//! reads events and owns all state is [`runtime::Shipper`].

pub mod event_handlers;
pub mod runtime;
pub mod shutdown;

pub use event_handlers::{handle_directory_created, handle_file_closed};
pub use runtime::Shipper;
pub use shutdown::Shutdown;
