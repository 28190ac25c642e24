// tests/error_classification.rs

mod common;

use std::io;
use std::path::PathBuf;

use fileshipper::errors::ShipperError;

fn io_err() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "denied")
}

#[test]
fn only_local_read_errors_are_survivable() {
    let local = ShipperError::LocalRead {
        path: PathBuf::from("/data/a.dat"),
        source: io_err(),
    };
    assert!(!local.is_fatal());
    assert!(!local.is_scan_failure());

    let fatal = [
        ShipperError::RetriesExhausted { failures: 360 },
        ShipperError::IoError(io_err()),
        ShipperError::WatchTable("broken".to_string()),
        ShipperError::Interrupted,
    ];
    for err in fatal {
        assert!(err.is_fatal(), "{err}");
        assert!(!err.is_scan_failure(), "{err}");
    }
}

#[test]
fn tree_problems_are_scan_failures() {
    let scan = [
        ShipperError::UnreadableDirectory {
            path: PathBuf::from("/data/x"),
            source: io_err(),
        },
        ShipperError::NameTooLong {
            name: "n".repeat(60),
            len: 60,
            max: 47,
        },
        ShipperError::PathTooLong {
            path: "/p".repeat(60),
            len: 120,
            max: 96,
        },
        ShipperError::WatchError(notify::Error::generic("no watch")),
    ];
    for err in scan {
        assert!(err.is_scan_failure(), "{err}");
        assert!(err.is_fatal(), "{err}");
    }
}

#[test]
fn messages_name_the_offending_path() {
    let err = ShipperError::UnreadableDirectory {
        path: PathBuf::from("/data/locked"),
        source: io_err(),
    };
    assert!(err.to_string().contains("/data/locked"));
}
