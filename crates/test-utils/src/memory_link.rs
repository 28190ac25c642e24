use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fileshipper::transport::{Connector, Link};

/// Behaviour of one established in-memory connection.
#[derive(Debug, Clone, Default)]
pub struct LinkScript {
    /// Fail writes with `BrokenPipe` once this many bytes have been written.
    pub fail_after_bytes: Option<usize>,
    /// Confirmation ids to answer with, one per file. When exhausted, the id
    /// of the frame just written is echoed.
    pub confirmations: VecDeque<u32>,
    /// Answer every read with end-of-stream.
    pub hang_up: bool,
}

impl LinkScript {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn failing_after(bytes: usize) -> Self {
        Self {
            fail_after_bytes: Some(bytes),
            ..Self::default()
        }
    }

    pub fn confirming(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            confirmations: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn hanging_up() -> Self {
        Self {
            hang_up: true,
            ..Self::default()
        }
    }
}

/// Outcome of one connection attempt.
#[derive(Debug, Clone)]
pub enum ConnectPlan {
    Refuse,
    Accept(LinkScript),
}

/// [`Connector`] that hands out in-memory links according to a plan.
///
/// Once the plan is exhausted every attempt gets `fallback`. All bytes
/// written on each link are kept for inspection.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    plans: Arc<Mutex<VecDeque<ConnectPlan>>>,
    fallback: ConnectPlan,
    attempts: Arc<AtomicUsize>,
    transcripts: Arc<Mutex<Vec<Arc<Mutex<Vec<u8>>>>>>,
}

impl MemoryConnector {
    pub fn new(plans: impl IntoIterator<Item = ConnectPlan>, fallback: ConnectPlan) -> Self {
        Self {
            plans: Arc::new(Mutex::new(plans.into_iter().collect())),
            fallback,
            attempts: Arc::new(AtomicUsize::new(0)),
            transcripts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every connection accepted, echoing confirmations.
    pub fn echoing() -> Self {
        Self::new([], ConnectPlan::Accept(LinkScript::echo()))
    }

    /// Every connection refused.
    pub fn refusing() -> Self {
        Self::new([], ConnectPlan::Refuse)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Bytes written on each accepted link, in connection order.
    pub fn transcripts(&self) -> Vec<Vec<u8>> {
        self.transcripts
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.lock().unwrap().clone())
            .collect()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self) -> io::Result<Box<dyn Link>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match plan {
            ConnectPlan::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
            ConnectPlan::Accept(script) => {
                let written = Arc::new(Mutex::new(Vec::new()));
                self.transcripts.lock().unwrap().push(Arc::clone(&written));
                Ok(Box::new(MemoryLink {
                    script,
                    written,
                    frame_start: 0,
                    reply: VecDeque::new(),
                }))
            }
        }
    }
}

struct MemoryLink {
    script: LinkScript,
    written: Arc<Mutex<Vec<u8>>>,
    /// Offset in `written` where the current, unconfirmed frame begins.
    frame_start: usize,
    reply: VecDeque<u8>,
}

impl Write for MemoryLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = self.written.lock().unwrap();
        let room = match self.script.fail_after_bytes {
            Some(limit) => limit.saturating_sub(written.len()),
            None => usize::MAX,
        };
        if room == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        let n = buf.len().min(room);
        written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.script.hang_up {
            return Ok(0);
        }
        if self.reply.is_empty() {
            let written = self.written.lock().unwrap();
            let frame = &written[self.frame_start..];
            if frame.len() < 4 {
                return Ok(0);
            }
            let id = self
                .script
                .confirmations
                .pop_front()
                .unwrap_or_else(|| u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]));
            self.reply.extend(id.to_le_bytes());
            self.frame_start = written.len();
        }

        let n = buf.len().min(self.reply.len());
        for (slot, byte) in buf.iter_mut().zip(self.reply.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Link for MemoryLink {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
