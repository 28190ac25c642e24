use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fileshipper::engine::{Shipper, Shutdown};
use fileshipper::fs::mock::MockFileSystem;
use fileshipper::fs::FileSystem;
use fileshipper::transport::{
    FileSender, MessageIdCounter, RetryPolicy, TransferSettings, TransportSession,
};
use fileshipper::watch::{DirectoryScanner, ScanLimits, WatchHandle, WatchTable};
use fileshipper_test_utils::{MemoryConnector, RecordingSink, ScriptedFacility};

pub const SERIAL: &str = "SN1";

pub fn root() -> PathBuf {
    PathBuf::from("/data")
}

pub fn default_limits() -> ScanLimits {
    ScanLimits {
        max_path_len: 96,
        max_name_len: 48,
    }
}

pub fn fast_policy(max_failures: u32) -> RetryPolicy {
    RetryPolicy {
        delay: Duration::from_millis(1),
        max_failures,
    }
}

pub fn fast_transfer(chunk_size: usize) -> TransferSettings {
    TransferSettings {
        chunk_size,
        data_suffix: ".dat".to_string(),
        pause_after_send: Duration::ZERO,
    }
}

pub fn sender_with(
    connector: MemoryConnector,
    fs: &MockFileSystem,
    max_failures: u32,
) -> FileSender<MemoryConnector> {
    let session = TransportSession::new(connector, fast_policy(max_failures), Shutdown::new());
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    FileSender::new(session, fs, SERIAL, fast_transfer(16))
        .with_message_ids(MessageIdCounter::new())
}

pub fn scanner_with(fs: &MockFileSystem, limits: ScanLimits, grace: Duration) -> DirectoryScanner {
    DirectoryScanner::new(Arc::new(fs.clone()), limits, grace, Shutdown::new())
}

/// A shipper over a mock filesystem whose sink deletes what it ships.
pub struct ShipperBuilder {
    fs: MockFileSystem,
    max_depth: usize,
    limits: ScanLimits,
    grace: Duration,
    facility: ScriptedFacility,
    sink: Option<RecordingSink>,
    shutdown: Shutdown,
}

impl ShipperBuilder {
    pub fn new(fs: &MockFileSystem) -> Self {
        Self {
            fs: fs.clone(),
            max_depth: 4,
            limits: default_limits(),
            grace: Duration::ZERO,
            facility: ScriptedFacility::new(),
            sink: None,
            shutdown: Shutdown::new(),
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn facility(mut self, facility: ScriptedFacility) -> Self {
        self.facility = facility;
        self
    }

    pub fn sink(mut self, sink: RecordingSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn build(self) -> Shipper<ScriptedFacility, RecordingSink> {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let sink = self
            .sink
            .unwrap_or_else(|| RecordingSink::deleting_from(Arc::clone(&fs)));
        let scanner = DirectoryScanner::new(fs, self.limits, self.grace, self.shutdown.clone());
        Shipper::new(
            WatchTable::new(self.max_depth),
            self.facility,
            sink,
            scanner,
            Duration::from_millis(5),
            self.shutdown,
        )
    }
}

/// Active slot paths of a table, shallowest first.
pub fn slot_paths(table: &WatchTable) -> Vec<PathBuf> {
    table.active().map(|(_, slot)| slot.path.clone()).collect()
}

pub fn handle_of(table: &WatchTable, dir: &Path) -> Option<WatchHandle> {
    table
        .active()
        .find(|(_, slot)| slot.path == dir)
        .map(|(_, slot)| slot.handle)
}
