// tests/shipper_runtime.rs

mod common;
use crate::common::builders::{handle_of, root, slot_paths, ShipperBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use fileshipper::engine::Shutdown;
use fileshipper::errors::ShipperError;
use fileshipper::fs::mock::MockFileSystem;
use fileshipper::watch::{WatchEvent, WatchHandle};
use fileshipper_test_utils::{RecordingSink, ScriptedFacility};

type TestResult = Result<(), Box<dyn Error>>;

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

/// `/data/sessionA/{x.dat,a.dat,sub1/f.dat}`
fn session_a() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/data/sessionA/x.dat", "x");
    fs.add_file("/data/sessionA/a.dat", "a");
    fs.add_file("/data/sessionA/sub1/f.dat", "f");
    fs
}

#[test]
fn startup_backfills_in_order_and_tracks_live_branch() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut shipper = ShipperBuilder::new(&fs).build();

    shipper.start(&root())?;

    assert_eq!(
        shipper.sink().shipped_relative(&root()),
        vec!["sessionA/a.dat", "sessionA/x.dat", "sessionA/sub1/f.dat"]
    );
    assert_eq!(
        slot_paths(shipper.table()),
        paths(&["/data", "/data/sessionA", "/data/sessionA/sub1"])
    );
    Ok(())
}

#[test]
fn new_directory_supersedes_deeper_chain() -> TestResult {
    init_tracing();
    let fs = session_a();
    let grace = Duration::from_millis(30);
    let mut shipper = ShipperBuilder::new(&fs).grace(grace).build();
    shipper.start(&root())?;

    fs.add_file("/data/sessionB/p.dat", "p");
    fs.add_file("/data/sessionB/q.dat", "q");
    let root_handle = handle_of(shipper.table(), &root()).ok_or("root not watched")?;

    shipper.handle_event(WatchEvent::directory_created(root_handle, "sessionB"))?;

    // Unwatched deepest first, then removed once empty.
    assert_eq!(
        shipper.facility().removed,
        paths(&["/data/sessionA/sub1", "/data/sessionA"])
    );
    assert!(!fs.exists("/data/sessionA/sub1"));
    assert!(!fs.exists("/data/sessionA"));

    assert_eq!(
        slot_paths(shipper.table()),
        paths(&["/data", "/data/sessionB"])
    );

    let sink = shipper.sink();
    assert_eq!(
        sink.shipped_relative(&root())[3..],
        ["sessionB/p.dat", "sessionB/q.dat"]
    );
    // The last pre-existing file waits for the grace period.
    let p_at = sink.shipped_at[3];
    let q_at = sink.shipped_at[4];
    assert!(q_at.duration_since(p_at) >= grace);
    Ok(())
}

#[test]
fn duplicate_directory_event_changes_nothing() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut shipper = ShipperBuilder::new(&fs).build();
    shipper.start(&root())?;
    let root_handle = handle_of(shipper.table(), &root()).ok_or("root not watched")?;
    let watches_before = shipper.facility().added.len();

    shipper.handle_event(WatchEvent::directory_created(root_handle, "sessionA"))?;

    assert_eq!(shipper.facility().added.len(), watches_before);
    assert!(shipper.facility().removed.is_empty());
    assert_eq!(slot_paths(shipper.table()).len(), 3);
    Ok(())
}

#[test]
fn directory_past_max_depth_is_ignored() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/data/a");
    let mut shipper = ShipperBuilder::new(&fs).max_depth(1).build();
    shipper.start(&root())?;

    fs.add_file("/data/a/b/c.dat", "c");
    let handle = handle_of(shipper.table(), PathBuf::from("/data/a").as_path())
        .ok_or("a not watched")?;
    shipper.handle_event(WatchEvent::directory_created(handle, "b"))?;

    assert_eq!(slot_paths(shipper.table()), paths(&["/data", "/data/a"]));
    assert!(shipper.sink().shipped.is_empty());
    Ok(())
}

#[test]
fn unknown_handle_is_ignored() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut shipper = ShipperBuilder::new(&fs).build();
    shipper.start(&root())?;

    shipper.handle_event(WatchEvent::directory_created(WatchHandle(9_999), "ghost"))?;
    shipper.handle_event(WatchEvent::file_closed(WatchHandle(9_999), "ghost.dat"))?;

    assert_eq!(slot_paths(shipper.table()).len(), 3);
    assert_eq!(shipper.sink().shipped.len(), 3);
    Ok(())
}

#[test]
fn closed_files_ship_only_from_the_deepest_directory() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut shipper = ShipperBuilder::new(&fs).build();
    shipper.start(&root())?;

    fs.add_file("/data/sessionA/sub1/new.dat", "n");
    fs.add_file("/data/sessionA/stray.dat", "s");
    let sub1 = handle_of(shipper.table(), PathBuf::from("/data/sessionA/sub1").as_path())
        .ok_or("sub1 not watched")?;
    let session = handle_of(shipper.table(), PathBuf::from("/data/sessionA").as_path())
        .ok_or("sessionA not watched")?;

    shipper.handle_event(WatchEvent::file_closed(session, "stray.dat"))?;
    shipper.handle_event(WatchEvent::file_closed(sub1, "new.dat"))?;

    let shipped = shipper.sink().shipped_relative(&root());
    assert_eq!(shipped.last().map(String::as_str), Some("sessionA/sub1/new.dat"));
    assert!(!shipped.iter().any(|p| p == "sessionA/stray.dat"));
    assert!(fs.exists("/data/sessionA/stray.dat"));
    Ok(())
}

#[test]
fn failed_backfill_of_new_directory_is_not_fatal() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut shipper = ShipperBuilder::new(&fs).build();
    shipper.start(&root())?;

    fs.add_unreadable_dir("/data/locked");
    let root_handle = handle_of(shipper.table(), &root()).ok_or("root not watched")?;
    shipper.handle_event(WatchEvent::directory_created(root_handle, "locked"))?;

    assert_eq!(
        slot_paths(shipper.table()),
        paths(&["/data", "/data/locked"])
    );
    Ok(())
}

#[test]
fn refused_watch_on_new_directory_is_not_fatal() -> TestResult {
    init_tracing();
    let fs = session_a();
    let mut facility = ScriptedFacility::new();
    facility.refuse.push(PathBuf::from("/data/sessionB"));
    let mut shipper = ShipperBuilder::new(&fs).facility(facility).build();
    shipper.start(&root())?;

    fs.add_dir("/data/sessionB");
    let root_handle = handle_of(shipper.table(), &root()).ok_or("root not watched")?;
    shipper.handle_event(WatchEvent::directory_created(root_handle, "sessionB"))?;

    assert_eq!(slot_paths(shipper.table()), paths(&["/data"]));
    Ok(())
}

#[test]
fn startup_scan_failure_is_fatal() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_unreadable_dir("/data/locked");
    let mut shipper = ShipperBuilder::new(&fs).build();

    let err = shipper.run(&root()).unwrap_err();
    assert!(matches!(err, ShipperError::UnreadableDirectory { .. }), "{err}");
}

#[test]
fn run_follows_events_until_shutdown() -> TestResult {
    init_tracing();
    let fs = session_a();
    let shutdown = Shutdown::new();

    let mut facility = ScriptedFacility::new().shutdown_when_drained(shutdown.clone());
    {
        let fs = fs.clone();
        facility.push_action(move || fs.add_file("/data/sessionB/p.dat", "p"));
    }
    facility.push_directory_created("/data", "sessionB");
    {
        let fs = fs.clone();
        facility.push_action(move || fs.add_file("/data/sessionB/late.dat", "l"));
    }
    facility.push_file_closed("/data/sessionB", "late.dat");
    facility.push_file_closed("/data", "stray.dat");

    let mut shipper = ShipperBuilder::new(&fs)
        .facility(facility)
        .shutdown(shutdown.clone())
        .build();

    shipper.run(&root())?;

    assert!(shutdown.is_requested());
    assert_eq!(
        shipper.sink().shipped_relative(&root()),
        vec![
            "sessionA/a.dat",
            "sessionA/x.dat",
            "sessionA/sub1/f.dat",
            "sessionB/p.dat",
            "sessionB/late.dat",
        ]
    );
    assert_eq!(slot_paths(shipper.table()), paths(&["/data", "/data/sessionB"]));
    assert!(!fs.exists("/data/sessionA"));
    Ok(())
}

#[test]
fn run_returns_cleanly_when_shutdown_already_requested() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/data");
    let shutdown = Shutdown::new();
    shutdown.request();

    let mut shipper = ShipperBuilder::new(&fs).shutdown(shutdown).build();
    shipper.run(&root())?;
    assert_eq!(slot_paths(shipper.table()), paths(&["/data"]));
    Ok(())
}

#[test]
fn local_read_failures_do_not_stop_the_loop() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/data/s");
    let sink = RecordingSink::new().with_unreadable("/data/s/bad.dat");
    let mut shipper = ShipperBuilder::new(&fs).sink(sink).build();
    shipper.start(&root())?;

    let handle = handle_of(shipper.table(), PathBuf::from("/data/s").as_path())
        .ok_or("s not watched")?;
    shipper.handle_event(WatchEvent::file_closed(handle, "bad.dat"))?;
    shipper.handle_event(WatchEvent::file_closed(handle, "good.dat"))?;

    assert_eq!(
        shipper.sink().shipped_relative(&root()),
        vec!["s/bad.dat", "s/good.dat"]
    );
    Ok(())
}
