// src/transport/session.rs

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::net::{Shutdown as NetShutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::TransportSection;
use crate::engine::shutdown::Shutdown;
use crate::errors::{Result, ShipperError};

/// A bidirectional byte stream to the collector.
pub trait Link: Read + Write + Send {
    /// Shut down both directions of the stream.
    fn close(&mut self) -> io::Result<()>;
}

impl Link for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(NetShutdown::Both)
    }
}

/// Makes a single connection attempt. Retrying is the session's job.
pub trait Connector: Send + Debug {
    fn connect(&self) -> io::Result<Box<dyn Link>>;
}

/// TCP connector with a connect timeout and per-direction socket timeouts.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    connect_timeout: Duration,
    socket_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr, connect_timeout: Duration, socket_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
            socket_timeout,
        }
    }

    pub fn from_config(addr: SocketAddr, transport: &TransportSection) -> Self {
        Self::new(addr, transport.connect_timeout(), transport.socket_timeout())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> io::Result<Box<dyn Link>> {
        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        stream.set_read_timeout(Some(self.socket_timeout))?;
        stream.set_write_timeout(Some(self.socket_timeout))?;
        Ok(Box::new(stream))
    }
}

/// How often and how patiently to retry a failing link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_failures: u32,
}

impl From<&TransportSection> for RetryPolicy {
    fn from(transport: &TransportSection) -> Self {
        Self {
            delay: transport.reconnect_delay(),
            max_failures: transport.max_failures,
        }
    }
}

/// Owns the persistent connection to the collector.
///
/// The session is "connected" exactly when it holds a link.
pub struct TransportSession<C: Connector> {
    connector: C,
    link: Option<Box<dyn Link>>,
    policy: RetryPolicy,
    shutdown: Shutdown,
}

impl<C: Connector> Debug for TransportSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("connector", &self.connector)
            .field("connected", &self.is_connected())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<C: Connector> TransportSession<C> {
    pub fn new(connector: C, policy: RetryPolicy, shutdown: Shutdown) -> Self {
        Self {
            connector,
            link: None,
            policy,
            shutdown,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn shutdown_token(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn link_mut(&mut self) -> Option<&mut (dyn Link + 'static)> {
        self.link.as_deref_mut()
    }

    /// One connection attempt. Any previous link is closed first.
    pub fn connect(&mut self) -> io::Result<()> {
        self.close();
        info!(connector = ?self.connector, "attempting to connect");
        let link = self.connector.connect()?;
        self.link = Some(link);
        info!("successfully connected");
        Ok(())
    }

    /// Connect, retrying with a fixed delay until it works or
    /// `max_failures` consecutive attempts have failed.
    pub fn connect_with_retry(&mut self) -> Result<()> {
        let mut failures = 0u32;
        loop {
            match self.connect() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    failures += 1;
                    warn!(
                        error = %err,
                        failures,
                        max_failures = self.policy.max_failures,
                        "could not connect"
                    );
                    if failures >= self.policy.max_failures {
                        return Err(ShipperError::RetriesExhausted { failures });
                    }
                    self.shutdown.sleep(self.policy.delay)?;
                }
            }
        }
    }

    /// Shut down and drop the link, if any.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            match link.close() {
                Ok(()) => debug!("connection closed"),
                Err(err) => debug!(error = %err, "error while shutting down connection"),
            }
        }
    }
}

impl<C: Connector> Drop for TransportSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}
