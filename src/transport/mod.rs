// src/transport/mod.rs

//! Reliable file transfer to the remote collector.
//!
//! - [`frame`]: wire format of one transfer and message id sequencing.
//! - [`session`]: the persistent connection with bounded reconnects.
//! - [`sender`]: one-file-at-a-time shipping with delete-on-confirm.

use std::path::Path;

use crate::errors::Result;

pub mod frame;
pub mod sender;
pub mod session;

pub use frame::{FrameHeader, MessageId, MessageIdCounter};
pub use sender::{FileSender, SendError, SendOutcome, TransferSettings};
pub use session::{Connector, Link, RetryPolicy, TcpConnector, TransportSession};

/// Destination for completed files.
///
/// Implementations must keep retrying transport problems internally: an
/// `Err` is either `ShipperError::LocalRead` for this one file or fatal.
pub trait FileSink {
    fn ship(&mut self, path: &Path) -> Result<SendOutcome>;
}
