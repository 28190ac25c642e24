// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Hard upper bound for `[watch].max_depth`.
pub const MAX_SUPPORTED_DEPTH: usize = 16;

/// Top-level configuration as read from an optional TOML file.
///
/// Every field has a compiled default, so an empty file (or no file at all)
/// yields the stock behaviour:
///
/// ```toml
/// [watch]
/// max_depth = 4
///
/// [transport]
/// reconnect_delay_secs = 10
///
/// [transfer]
/// chunk_size = 31560
/// data_suffix = ".dat"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub transfer: TransferSection,
}

/// `[watch]` section: directory tracking limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Deepest tracked directory level. The root directory is depth 0.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Initial capacity of the queue of translated watch events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Maximum length in bytes of a full path, including the separators.
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Maximum length in bytes of a file or directory name.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Event loop liveness tick.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_max_depth() -> usize {
    4
}

fn default_event_buffer() -> usize {
    128
}

fn default_max_path_len() -> usize {
    96
}

fn default_max_name_len() -> usize {
    48
}

fn default_tick_secs() -> u64 {
    2
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            event_buffer: default_event_buffer(),
            max_path_len: default_max_path_len(),
            max_name_len: default_max_name_len(),
            tick_secs: default_tick_secs(),
        }
    }
}

impl WatchSection {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

/// `[transport]` section: connection and retry behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    /// Port used when none is given on the command line.
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Consecutive connect/send failures tolerated before giving up.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Read and write timeout applied to the socket, independently.
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,

    /// Timeout for a single connection attempt.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_reconnect_delay_secs() -> u64 {
    10
}

fn default_max_failures() -> u32 {
    360
}

fn default_socket_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_failures: default_max_failures(),
            socket_timeout_secs: default_socket_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl TransportSection {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// `[transfer]` section: how individual files are shipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferSection {
    /// Size of the portions a file is streamed in.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay before shipping the newest file found by a live backfill scan,
    /// giving a concurrent writer time to close it.
    #[serde(default = "default_last_file_grace_secs")]
    pub last_file_grace_secs: u64,

    /// Only files whose path ends with this suffix are shipped.
    #[serde(default = "default_data_suffix")]
    pub data_suffix: String,

    /// Pause after every completed exchange with the collector.
    #[serde(default = "default_pause_after_send_millis")]
    pub pause_after_send_millis: u64,
}

fn default_chunk_size() -> usize {
    31560
}

fn default_last_file_grace_secs() -> u64 {
    240
}

fn default_data_suffix() -> String {
    ".dat".to_string()
}

fn default_pause_after_send_millis() -> u64 {
    1000
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            last_file_grace_secs: default_last_file_grace_secs(),
            data_suffix: default_data_suffix(),
            pause_after_send_millis: default_pause_after_send_millis(),
        }
    }
}

impl TransferSection {
    pub fn last_file_grace(&self) -> Duration {
        Duration::from_secs(self.last_file_grace_secs)
    }

    pub fn pause_after_send(&self) -> Duration {
        Duration::from_millis(self.pause_after_send_millis)
    }
}
