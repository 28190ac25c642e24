// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod transport;
pub mod watch;

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{Shipper, Shutdown};
use crate::errors::{Result, ShipperError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::transport::{
    FileSender, RetryPolicy, TcpConnector, TransferSettings, TransportSession,
};
use crate::watch::{DirectoryScanner, NotifyFacility, ScanLimits, WatchTable};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and server address resolution
/// - Ctrl-C handling
/// - the blocking daemon core (run on tokio's blocking pool)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let port = args.port.unwrap_or(cfg.transport.default_port);
    let addr = resolve_server(&args.server, port)?;

    if !args.watch_dir.is_dir() {
        return Err(ShipperError::ConfigError(format!(
            "{} is not a valid directory",
            args.watch_dir.display()
        )));
    }

    let shutdown = Shutdown::new();

    // Ctrl-C → graceful shutdown.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received");
            shutdown.request();
        });
    }

    tokio::task::spawn_blocking(move || run_blocking(args, cfg, addr, shutdown))
        .await
        .map_err(|err| anyhow!("daemon thread failed: {err}"))?
}

/// Resolve `server:port`, preferring the first address returned.
pub fn resolve_server(server: &str, port: u16) -> Result<SocketAddr> {
    (server, port)
        .to_socket_addrs()
        .map_err(|err| ShipperError::ConfigError(format!("invalid server address {server}: {err}")))?
        .next()
        .ok_or_else(|| ShipperError::ConfigError(format!("server {server} did not resolve")))
}

/// The daemon proper: connect, backfill, then follow watch events until
/// shutdown. Blocks the calling thread.
pub fn run_blocking(
    args: CliArgs,
    cfg: ConfigFile,
    addr: SocketAddr,
    shutdown: Shutdown,
) -> Result<()> {
    info!(
        watch_dir = ?args.watch_dir,
        %addr,
        serial = %args.serial,
        max_depth = cfg.watch.max_depth,
        "starting fileshipper"
    );

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let session = TransportSession::new(
        TcpConnector::from_config(addr, &cfg.transport),
        RetryPolicy::from(&cfg.transport),
        shutdown.clone(),
    );
    let mut sender = FileSender::new(
        session,
        Arc::clone(&fs),
        args.serial.clone(),
        TransferSettings::from(&cfg.transfer),
    );

    match sender.session_mut().connect_with_retry() {
        Ok(()) => {}
        Err(ShipperError::Interrupted) => {
            info!("shutdown requested before connecting");
            return Ok(());
        }
        Err(err) => {
            error!(error = %err, "could not reach the collector");
            return Err(err);
        }
    }

    let facility = NotifyFacility::new(cfg.watch.event_buffer)?;
    let scanner = DirectoryScanner::new(
        fs,
        ScanLimits::from(&cfg.watch),
        cfg.transfer.last_file_grace(),
        shutdown.clone(),
    );

    let mut shipper = Shipper::new(
        WatchTable::new(cfg.watch.max_depth),
        facility,
        sender,
        scanner,
        cfg.watch.tick(),
        shutdown,
    );

    let result = shipper.run(&args.watch_dir);
    shipper.sink_mut().close();
    match &result {
        Ok(()) => info!("exiting"),
        Err(err) => error!(error = %err, "fatal error; exiting"),
    }
    result
}
