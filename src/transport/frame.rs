// src/transport/frame.rs

//! Wire format of one file transfer.
//!
//! ```text
//! [ message_id:u32 | path_len:u32 | serial_len:u32 | content_len:u32
//!   | path bytes, zero-padded to a 4-byte boundary
//!   | serial bytes, zero-padded to a 4-byte boundary ]
//! [ content_len bytes of file content ]
//! <- [ confirmation_id:u32 ]
//! ```
//!
//! All integers are little-endian regardless of the host, which is what the
//! existing collector expects.

use std::fmt;
use std::io::{self, Read};

/// Size of the four fixed `u32` fields at the start of a header.
pub const FIXED_HEADER_LEN: usize = 16;

/// Round `len` up to the next multiple of 4.
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Identifier the collector echoes back to confirm a file. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u32);

impl MessageId {
    pub const FIRST: MessageId = MessageId(1);

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id after this one: wraps from `u32::MAX` to 1, skipping 0.
    pub fn next(self) -> MessageId {
        match self.0.checked_add(1) {
            Some(n) => MessageId(n),
            None => MessageId::FIRST,
        }
    }
}

impl TryFrom<u32> for MessageId {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 { Err(value) } else { Ok(MessageId(value)) }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of message ids for consecutive transfers.
#[derive(Debug, Clone)]
pub struct MessageIdCounter {
    next: MessageId,
}

impl Default for MessageIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIdCounter {
    pub fn new() -> Self {
        Self::starting_at(MessageId::FIRST)
    }

    pub fn starting_at(next: MessageId) -> Self {
        Self { next }
    }

    /// The id the next transfer will carry.
    pub fn current(&self) -> MessageId {
        self.next
    }

    pub fn advance(&mut self) {
        self.next = self.next.next();
    }
}

/// Header sent before a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_id: u32,
    pub path: Vec<u8>,
    pub serial: Vec<u8>,
    pub content_len: u32,
}

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

impl FrameHeader {
    /// Build a header, checking every length fits its `u32` field.
    pub fn new(
        message_id: MessageId,
        path: &[u8],
        serial: &[u8],
        content_len: u64,
    ) -> io::Result<Self> {
        u32::try_from(path.len())
            .map_err(|_| invalid_input(format!("path of {} bytes is too long", path.len())))?;
        u32::try_from(serial.len())
            .map_err(|_| invalid_input(format!("serial of {} bytes is too long", serial.len())))?;
        let content_len = u32::try_from(content_len)
            .map_err(|_| invalid_input(format!("file of {content_len} bytes is too large")))?;

        Ok(Self {
            message_id: message_id.get(),
            path: path.to_vec(),
            serial: serial.to_vec(),
            content_len,
        })
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN + padded_len(self.path.len()) + padded_len(self.serial.len())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.message_id.to_le_bytes());
        buf.extend_from_slice(&(self.path.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.serial.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.content_len.to_le_bytes());
        push_padded(&mut buf, &self.path);
        push_padded(&mut buf, &self.serial);
        buf
    }

    /// Read a header as the collector does. Padding bytes are discarded.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut fixed = [0u8; FIXED_HEADER_LEN];
        reader.read_exact(&mut fixed)?;

        let field = |i: usize| {
            u32::from_le_bytes([fixed[i], fixed[i + 1], fixed[i + 2], fixed[i + 3]])
        };
        let message_id = field(0);
        let path_len = field(4) as usize;
        let serial_len = field(8) as usize;
        let content_len = field(12);

        let path = read_padded(reader, path_len)?;
        let serial = read_padded(reader, serial_len)?;

        Ok(Self {
            message_id,
            path,
            serial,
            content_len,
        })
    }
}

fn push_padded(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + padded_len(bytes.len()) - bytes.len(), 0);
}

fn read_padded<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut bytes = vec![0u8; padded_len(len)];
    reader.read_exact(&mut bytes)?;
    bytes.truncate(len);
    Ok(bytes)
}
