// src/transport/sender.rs

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TransferSection;
use crate::errors::{Result, ShipperError};
use crate::fs::FileSystem;
use crate::transport::frame::{FrameHeader, MessageId, MessageIdCounter};
use crate::transport::session::{Connector, Link, TransportSession};
use crate::transport::FileSink;

/// What happened to a file after one exchange with the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Confirmed by the collector; the local copy was deleted (best-effort).
    Delivered { id: MessageId },
    /// Not a data file; nothing was sent.
    Skipped,
    /// The collector answered with the wrong id. The file is kept.
    Unconfirmed { sent: MessageId, received: u32 },
}

/// Why a single transfer attempt failed.
#[derive(Debug, Error)]
pub enum SendError {
    /// The file itself could not be read. Retrying over a new connection
    /// would not help.
    #[error("could not read {}: {source}", path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The connection failed; the file is intact and can be resent.
    #[error("could not send {}: {source}", path.display())]
    Transport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-file transfer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub chunk_size: usize,
    pub data_suffix: String,
    pub pause_after_send: Duration,
}

impl From<&TransferSection> for TransferSettings {
    fn from(transfer: &TransferSection) -> Self {
        Self {
            chunk_size: transfer.chunk_size,
            data_suffix: transfer.data_suffix.clone(),
            pause_after_send: transfer.pause_after_send(),
        }
    }
}

/// Ships files one at a time over a [`TransportSession`] and deletes them
/// once the collector confirms receipt.
#[derive(Debug)]
pub struct FileSender<C: Connector> {
    session: TransportSession<C>,
    fs: Arc<dyn FileSystem>,
    ids: MessageIdCounter,
    serial: String,
    settings: TransferSettings,
}

impl<C: Connector> FileSender<C> {
    pub fn new(
        session: TransportSession<C>,
        fs: Arc<dyn FileSystem>,
        serial: impl Into<String>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            session,
            fs,
            ids: MessageIdCounter::new(),
            serial: serial.into(),
            settings,
        }
    }

    /// Start numbering at `next` instead of 1.
    pub fn with_message_ids(mut self, ids: MessageIdCounter) -> Self {
        self.ids = ids;
        self
    }

    /// The id the next transfer will carry.
    pub fn next_message_id(&self) -> MessageId {
        self.ids.current()
    }

    pub fn session(&self) -> &TransportSession<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TransportSession<C> {
        &mut self.session
    }

    pub fn is_data_file(&self, path: &Path) -> bool {
        path.as_os_str()
            .as_encoded_bytes()
            .ends_with(self.settings.data_suffix.as_bytes())
    }

    /// One transfer attempt over the current link.
    pub fn send(&mut self, path: &Path) -> std::result::Result<SendOutcome, SendError> {
        if !self.is_data_file(path) {
            info!(?path, suffix = %self.settings.data_suffix, "skipping file (not a data file)");
            return Ok(SendOutcome::Skipped);
        }

        let local = |source| SendError::LocalRead {
            path: path.to_path_buf(),
            source,
        };
        let transport = |source| SendError::Transport {
            path: path.to_path_buf(),
            source,
        };

        let mut opened = self.fs.open_read(path).map_err(local)?;
        let sent = self.ids.current();
        let header = FrameHeader::new(
            sent,
            path.as_os_str().as_encoded_bytes(),
            self.serial.as_bytes(),
            opened.len,
        )
        .map_err(local)?;

        let Some(link) = self.session.link_mut() else {
            return Err(transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "no connection to the collector",
            )));
        };

        debug!(?path, id = %sent, len = opened.len, "sending file");
        link.write_all(&header.encode()).map_err(transport)?;
        let streamed = stream_content(
            link,
            opened.reader.as_mut(),
            opened.len,
            self.settings.chunk_size,
        );
        match streamed {
            Ok(()) => {}
            Err(StreamError::Read(source)) => {
                // The collector is still waiting for the rest of this file and
                // would take the next header as content.
                warn!(?path, id = %sent, "dropping connection after a partial transfer");
                self.session.close();
                return Err(local(source));
            }
            Err(StreamError::Write(source)) => return Err(transport(source)),
        }
        link.flush().map_err(transport)?;

        let received = read_confirmation(link).map_err(transport)?;

        // The collector has consumed `sent` either way.
        self.ids.advance();

        let outcome = if received == sent.get() {
            if let Err(err) = self.fs.remove_file(path) {
                warn!(
                    ?path,
                    error = %err,
                    "file was sent and confirmed but could not be deleted"
                );
            }
            info!(?path, id = %sent, "file delivered");
            SendOutcome::Delivered { id: sent }
        } else {
            warn!(
                ?path,
                sent = %sent,
                received,
                "received improper confirmation of receipt (file will not be deleted)"
            );
            SendOutcome::Unconfirmed { sent, received }
        };

        if !self.settings.pause_after_send.is_zero()
            && self
                .session
                .shutdown_token()
                .sleep(self.settings.pause_after_send)
                .is_err()
        {
            debug!("shutdown requested during post-send pause");
        }

        Ok(outcome)
    }

    /// Send `path`, reconnecting and resending from scratch after every
    /// transport failure.
    ///
    /// Never returns a transport error: either the file went through (or was
    /// skipped), it could not be read (`ShipperError::LocalRead`), or the
    /// link is beyond recovery and the error is fatal.
    pub fn send_until_success(&mut self, path: &Path) -> Result<SendOutcome> {
        if !self.is_data_file(path) {
            return self.send(path).map_err(into_shipper_error);
        }

        if !self.session.is_connected() {
            self.session.connect_with_retry()?;
        }

        let policy = self.session.policy();
        let mut failures = 0u32;
        loop {
            match self.send(path) {
                Ok(outcome) => return Ok(outcome),
                Err(err @ SendError::LocalRead { .. }) => return Err(into_shipper_error(err)),
                Err(SendError::Transport { source, .. }) => {
                    failures += 1;
                    warn!(?path, error = %source, failures, "connection appears to be lost");
                    if failures >= policy.max_failures {
                        return Err(ShipperError::RetriesExhausted { failures });
                    }
                    self.session.close();
                    self.session.shutdown_token().sleep(policy.delay)?;
                    self.session.connect_with_retry()?;
                }
            }
        }
    }

    /// Close the connection, e.g. on shutdown.
    pub fn close(&mut self) {
        self.session.close();
    }
}

impl<C: Connector> FileSink for FileSender<C> {
    fn ship(&mut self, path: &Path) -> Result<SendOutcome> {
        self.send_until_success(path)
    }
}

fn into_shipper_error(err: SendError) -> ShipperError {
    match err {
        SendError::LocalRead { path, source } => ShipperError::LocalRead { path, source },
        SendError::Transport { path, source } => {
            ShipperError::IoError(io::Error::new(
                source.kind(),
                format!("could not send {}: {source}", path.display()),
            ))
        }
    }
}

enum StreamError {
    Read(io::Error),
    Write(io::Error),
}

/// Stream exactly `len` bytes from `reader` in chunks of at most
/// `chunk_size`. Running out of data early is a read error.
fn stream_content(
    link: &mut dyn Link,
    reader: &mut dyn Read,
    len: u64,
    chunk_size: usize,
) -> std::result::Result<(), StreamError> {
    let mut buf = vec![0u8; chunk_size.min(usize::try_from(len).unwrap_or(usize::MAX))];
    let mut remaining = len;
    while remaining > 0 {
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let mut filled = 0;
        while filled < want {
            match reader.read(&mut buf[filled..want]) {
                Ok(0) => {
                    return Err(StreamError::Read(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "could not finish reading file (read {} of {} bytes)",
                            len - remaining + filled as u64,
                            len
                        ),
                    )));
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(StreamError::Read(err)),
            }
        }
        link.write_all(&buf[..want]).map_err(StreamError::Write)?;
        remaining -= want as u64;
    }
    Ok(())
}

fn read_confirmation(link: &mut dyn Link) -> io::Result<u32> {
    let mut confirmation = [0u8; 4];
    link.read_exact(&mut confirmation).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection was closed before confirmation was received",
            )
        } else {
            err
        }
    })?;
    Ok(u32::from_le_bytes(confirmation))
}
