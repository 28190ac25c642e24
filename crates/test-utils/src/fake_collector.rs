use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use fileshipper::transport::FrameHeader;

/// One file as seen by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub message_id: u32,
    pub path: Vec<u8>,
    pub serial: Vec<u8>,
    pub content: Vec<u8>,
}

impl ReceivedFile {
    pub fn path_lossy(&self) -> String {
        String::from_utf8_lossy(&self.path).into_owned()
    }
}

/// How the collector answers one received file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Confirm with the id from the header.
    Echo,
    /// Confirm with a fixed (possibly wrong) id.
    Id(u32),
    /// Drop the connection without confirming.
    Hangup,
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Reply>,
    received: Vec<ReceivedFile>,
    connections: usize,
}

/// A TCP collector on `127.0.0.1` that records every complete file and
/// replies from a script, echoing once the script runs out.
///
/// The accept loop runs on a detached thread for the life of the test
/// process.
#[derive(Debug, Clone)]
pub struct FakeCollector {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeCollector {
    pub fn start() -> std::io::Result<Self> {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: impl IntoIterator<Item = Reply>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(State {
            script: script.into_iter().collect(),
            ..State::default()
        }));

        let thread_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                thread_state.lock().unwrap().connections += 1;
                let conn_state = Arc::clone(&thread_state);
                thread::spawn(move || serve(stream, conn_state));
            }
        });

        Ok(Self { addr, state })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn received(&self) -> Vec<ReceivedFile> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }
}

fn serve(mut stream: TcpStream, state: Arc<Mutex<State>>) {
    loop {
        let Ok(header) = FrameHeader::read_from(&mut stream) else {
            return;
        };
        let mut content = vec![0u8; header.content_len as usize];
        if stream.read_exact(&mut content).is_err() {
            return;
        }

        let reply = {
            let mut state = state.lock().unwrap();
            state.received.push(ReceivedFile {
                message_id: header.message_id,
                path: header.path.clone(),
                serial: header.serial.clone(),
                content,
            });
            state.script.pop_front().unwrap_or(Reply::Echo)
        };

        let id = match reply {
            Reply::Echo => header.message_id,
            Reply::Id(id) => id,
            Reply::Hangup => return,
        };
        if stream.write_all(&id.to_le_bytes()).is_err() {
            return;
        }
    }
}
