// src/engine/runtime.rs

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::event_handlers::{handle_directory_created, handle_file_closed};
use crate::engine::shutdown::Shutdown;
use crate::errors::{Result, ShipperError};
use crate::transport::FileSink;
use crate::watch::{
    DirectoryScanner, ScanContext, WatchEvent, WatchEventKind, WatchFacility, WatchTable,
};

/// The daemon's single control loop.
///
/// Owns the watch table, the notification facility and the file sink, and
/// drives them from one thread: every event is handled to completion
/// (including any backfill it triggers) before the next one is read.
pub struct Shipper<F: WatchFacility, S: FileSink> {
    table: WatchTable,
    facility: F,
    sink: S,
    scanner: DirectoryScanner,
    tick: Duration,
    shutdown: Shutdown,
}

impl<F: WatchFacility, S: FileSink> fmt::Debug for Shipper<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shipper")
            .field("table", &self.table)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl<F: WatchFacility, S: FileSink> Shipper<F, S> {
    pub fn new(
        table: WatchTable,
        facility: F,
        sink: S,
        scanner: DirectoryScanner,
        tick: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            table,
            facility,
            sink,
            scanner,
            tick,
            shutdown,
        }
    }

    pub fn table(&self) -> &WatchTable {
        &self.table
    }

    pub fn facility(&self) -> &F {
        &self.facility
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Watch `root` and ship everything already below it.
    ///
    /// Any failure here is fatal: the tree cannot be tracked as configured.
    pub fn start(&mut self, root: &Path) -> Result<()> {
        let handle = self.facility.add_watch(root)?;
        self.table.install_root(handle, root)?;

        info!(?root, "processing existing files");
        let mut ctx = ScanContext {
            table: &mut self.table,
            facility: &mut self.facility,
            sink: &mut self.sink,
        };
        self.scanner.scan(root, 0, true, &mut ctx)?;
        info!("finished processing existing files");
        Ok(())
    }

    /// Wait for one event (or one tick) and handle it.
    ///
    /// Returns `Ok(false)` once shutdown has been requested.
    pub fn step(&mut self) -> Result<bool> {
        if self.shutdown.is_requested() {
            return Ok(false);
        }
        match self.facility.next_event(self.tick)? {
            Some(event) => self.handle_event(event)?,
            None => debug!("tick"),
        }
        Ok(!self.shutdown.is_requested())
    }

    pub fn handle_event(&mut self, event: WatchEvent) -> Result<()> {
        debug!(?event, "handling watch event");
        match event.kind {
            WatchEventKind::DirectoryCreated => {
                let mut ctx = ScanContext {
                    table: &mut self.table,
                    facility: &mut self.facility,
                    sink: &mut self.sink,
                };
                handle_directory_created(&mut ctx, &self.scanner, event.handle, &event.name)
            }
            WatchEventKind::FileClosed => {
                handle_file_closed(&self.table, &mut self.sink, event.handle, &event.name)
            }
        }
    }

    /// Start on `root`, then handle events until shutdown is requested.
    ///
    /// An interrupted wait counts as a clean shutdown.
    pub fn run(&mut self, root: &Path) -> Result<()> {
        let result = self.start(root).and_then(|()| {
            info!("shipper event loop started");
            while self.step()? {}
            Ok(())
        });

        match result {
            Ok(()) | Err(ShipperError::Interrupted) => {
                info!("shutdown requested; event loop stopped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
