//! End-to-end runs of the orchestrator against an in-memory FAT volume.

use std::path::Path;

use fatattr_core::channel::memory::{Fault, MemoryBackend};
use fatattr_core::{AttributeChannel, AttributeSet, BatchReport, FatattrConfig, Orchestrator};

/// /mnt
/// ├── A.TXT                  (archive, short name only)
/// ├── averylongfilename.txt  (hidden, long name)
/// └── sub
///     └── C.TXT              (system)
fn volume() -> MemoryBackend {
    let vol = MemoryBackend::new();
    vol.add_dir("/mnt", AttributeSet::empty());
    vol.add_file("/mnt/A.TXT", "A.TXT", "", AttributeSet::ARCHIVE);
    vol.add_file(
        "/mnt/averylongfilename.txt",
        "AVERYL~1.TXT",
        "averylongfilename.txt",
        AttributeSet::HIDDEN,
    );
    vol.add_dir("/mnt/sub", AttributeSet::empty());
    vol.add_file("/mnt/sub/C.TXT", "C.TXT", "", AttributeSet::SYSTEM);
    vol
}

struct Run {
    report: BatchReport,
    stdout: String,
    stderr: String,
    channel: AttributeChannel<MemoryBackend>,
}

fn run(vol: MemoryBackend, cfg: &FatattrConfig, paths: &[&str]) -> Run {
    let channel = AttributeChannel::new(vol);
    let mut out = Vec::new();
    let mut err = Vec::new();
    let report = Orchestrator::new(&channel, cfg, &mut out, &mut err).run(paths);
    Run {
        report,
        stdout: String::from_utf8(out).unwrap(),
        stderr: String::from_utf8(err).unwrap(),
        channel,
    }
}

fn print_config() -> FatattrConfig {
    FatattrConfig::builder().build().unwrap()
}

// ── Print mode ─────────────────────────────────────────────────────

#[test]
fn print_single_file() {
    let r = run(volume(), &print_config(), &["/mnt/A.TXT"]);
    assert_eq!(r.stdout, "---A--  /mnt/A.TXT\n");
    assert!(r.stderr.is_empty());
    assert_eq!(r.report.last_status, 0);
}

#[test]
fn print_directory_lists_its_entries_once() {
    let r = run(volume(), &print_config(), &["/mnt"]);
    let expected = "\
----D-  /mnt
----D-  /mnt/.
----D-  /mnt/..
---A--  /mnt/A.TXT
-H----  /mnt/averylongfilename.txt
----D-  /mnt/sub
";
    assert_eq!(r.stdout, expected);
    assert!(r.stderr.is_empty());
}

#[test]
fn print_recursive_descends_but_skips_dot_entries() {
    let cfg = FatattrConfig::builder().recursive(true).build().unwrap();
    let r = run(volume(), &cfg, &["/mnt"]);
    let expected = "\
----D-  /mnt
----D-  /mnt/.
----D-  /mnt/..
---A--  /mnt/A.TXT
-H----  /mnt/averylongfilename.txt
----D-  /mnt/sub
----D-  /mnt/sub/.
----D-  /mnt/sub/..
--S---  /mnt/sub/C.TXT
";
    assert_eq!(r.stdout, expected);
}

#[test]
fn every_handle_is_released() {
    let cfg = FatattrConfig::builder().recursive(true).build().unwrap();
    let r = run(volume(), &cfg, &["/mnt"]);
    let lines = r.stdout.lines().count();
    assert_eq!(r.channel.backend().releases(), lines);
}

// ── Modify mode ────────────────────────────────────────────────────

#[test]
fn verbose_add_read_only() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::READ_ONLY)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/A.TXT"]);
    assert_eq!(r.stdout, "---A-- => R--A--  /mnt/A.TXT\n");
    assert_eq!(
        r.channel.backend().attributes("/mnt/A.TXT"),
        Some(AttributeSet::READ_ONLY | AttributeSet::ARCHIVE)
    );
    assert_eq!(r.channel.backend().writes(), 1);
}

#[test]
fn quiet_modify_prints_nothing() {
    let cfg = FatattrConfig::builder()
        .remove(AttributeSet::ARCHIVE)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/A.TXT"]);
    assert!(r.stdout.is_empty());
    assert_eq!(
        r.channel.backend().attributes("/mnt/A.TXT"),
        Some(AttributeSet::empty())
    );
}

#[test]
fn redundant_changes_skip_kernel_writes() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::ARCHIVE)
        .remove(AttributeSet::READ_ONLY | AttributeSet::SYSTEM)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/A.TXT"]);
    assert_eq!(r.stdout, "---A-- => ---A--  /mnt/A.TXT\n");
    assert_eq!(r.channel.backend().writes(), 0);
}

#[test]
fn add_and_remove_in_one_run() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::SYSTEM | AttributeSet::READ_ONLY)
        .remove(AttributeSet::HIDDEN)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/averylongfilename.txt"]);
    assert_eq!(
        r.stdout,
        "-H---- => R-S---  /mnt/averylongfilename.txt\n"
    );
    assert_eq!(r.channel.backend().writes(), 2);
}

#[test]
fn modify_without_recursion_leaves_children_alone() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::HIDDEN)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt"]);
    let vol = r.channel.backend();
    assert_eq!(
        vol.attributes("/mnt"),
        Some(AttributeSet::HIDDEN | AttributeSet::DIRECTORY)
    );
    assert_eq!(vol.attributes("/mnt/A.TXT"), Some(AttributeSet::ARCHIVE));
    assert_eq!(vol.releases(), 1);
}

#[test]
fn modify_recursive_reaches_nested_files() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::HIDDEN)
        .recursive(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt"]);
    let vol = r.channel.backend();
    assert!(vol.attributes("/mnt/A.TXT").unwrap().contains(AttributeSet::HIDDEN));
    assert!(vol.attributes("/mnt/sub").unwrap().contains(AttributeSet::HIDDEN));
    assert!(vol.attributes("/mnt/sub/C.TXT").unwrap().contains(AttributeSet::HIDDEN));
    assert!(r.stderr.is_empty());
}

#[test]
fn dot_entries_are_processed_but_not_descended() {
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::HIDDEN)
        .recursive(true)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/sub"]);
    let expected = "\
----D- => -H--D-  /mnt/sub
-H--D- => -H--D-  /mnt/sub/.
----D- => -H--D-  /mnt/sub/..
--S--- => -HS---  /mnt/sub/C.TXT
";
    assert_eq!(r.stdout, expected);
    // `..` is the parent; its own children were never visited.
    assert_eq!(r.channel.backend().attributes("/mnt/A.TXT"), Some(AttributeSet::ARCHIVE));
}

#[test]
fn add_then_remove_restores_attributes() {
    let channel = AttributeChannel::new(volume());
    let h = channel.open(Path::new("/mnt/A.TXT")).unwrap();
    let original = channel.get_attributes(&h).unwrap();
    for bits in [
        AttributeSet::READ_ONLY,
        AttributeSet::HIDDEN,
        AttributeSet::SYSTEM,
        AttributeSet::READ_ONLY | AttributeSet::HIDDEN | AttributeSet::SYSTEM,
    ] {
        channel.add_attributes(&h, bits).unwrap();
        channel.remove_attributes(&h, bits).unwrap();
        assert_eq!(channel.get_attributes(&h).unwrap(), original);
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[test]
fn last_path_decides_status() {
    let r = run(volume(), &print_config(), &["/nope", "/mnt/A.TXT"]);
    assert!(r
        .stderr
        .starts_with("Error processing file '/nope': Error opening file: "));
    assert_eq!(r.stdout, "---A--  /mnt/A.TXT\n");
    assert_eq!(
        r.report,
        BatchReport {
            processed: 2,
            failed: 1,
            last_status: 0
        }
    );

    let r = run(volume(), &print_config(), &["/mnt/A.TXT", "/nope"]);
    assert_eq!(r.report.last_status, 1);
}

#[test]
fn child_failure_does_not_stop_siblings() {
    let vol = volume();
    vol.inject("/mnt/A.TXT", Fault::GetAttributes);
    let r = run(vol, &print_config(), &["/mnt"]);
    assert!(r.stderr.starts_with(
        "Error processing file '/mnt/A.TXT': Error in ioctl call 'FAT_IOCTL_GET_ATTRIBUTES': "
    ));
    assert_eq!(r.stderr.lines().count(), 1);
    assert!(r.stdout.contains("-H----  /mnt/averylongfilename.txt\n"));
    assert!(r.stdout.contains("----D-  /mnt/sub\n"));
    assert_eq!(r.report.last_status, 0);
}

#[test]
fn readdir_failure_ends_drain_and_is_reported() {
    let vol = volume();
    vol.inject("/mnt", Fault::ReadDirAfter(3));
    let r = run(vol, &print_config(), &["/mnt"]);
    assert_eq!(r.stdout.lines().count(), 4);
    assert!(r.stdout.ends_with("---A--  /mnt/A.TXT\n"));
    assert!(r
        .stderr
        .starts_with("Error processing file '/mnt': Error in ioctl call 'VFAT_IOCTL_READDIR_BOTH'"));
    assert_eq!(r.report.last_status, 0);
    // The directory handle is released once, by the channel.
    assert_eq!(r.channel.backend().releases(), 4);
}

#[test]
fn long_name_over_limit_is_skipped() {
    let cfg = FatattrConfig::builder().max_name_len(8).build().unwrap();
    let r = run(volume(), &cfg, &["/mnt"]);
    assert_eq!(
        r.stderr,
        "Error processing file '/mnt': The entry name is bigger than the read buffer\n"
    );
    assert!(!r.stdout.contains("averylongfilename"));
    assert!(r.stdout.ends_with("----D-  /mnt/sub\n"));
}

#[test]
fn failed_write_reports_set_failure() {
    let vol = volume();
    vol.inject("/mnt/A.TXT", Fault::SetAttributes);
    let cfg = FatattrConfig::builder()
        .add(AttributeSet::READ_ONLY)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(vol, &cfg, &["/mnt/A.TXT", "/mnt/averylongfilename.txt"]);
    assert!(r.stderr.starts_with(
        "Error processing file '/mnt/A.TXT': Error in ioctl call 'FAT_IOCTL_SET_ATTRIBUTES': "
    ));
    assert_eq!(r.stdout, "-H---- => RH----  /mnt/averylongfilename.txt\n");
    assert_eq!(r.report.failed, 1);
    assert_eq!(r.channel.backend().releases(), 2);

    let vol = volume();
    vol.inject("/mnt/A.TXT", Fault::SetAttributes);
    let r = run(vol, &cfg, &["/mnt/A.TXT"]);
    assert_eq!(r.report.last_status, 3);
}

// ── Bits the filesystem owns ───────────────────────────────────────

#[test]
fn removing_directory_bit_is_a_silent_no_op() {
    let cfg = FatattrConfig::builder()
        .remove(AttributeSet::DIRECTORY)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &cfg, &["/mnt/sub"]);
    assert_eq!(r.stdout, "----D- => ----D-  /mnt/sub\n");
    assert!(r.stderr.is_empty());
    assert_eq!(r.report.last_status, 0);
}

#[test]
fn volume_label_bit_sticks_once_set() {
    let add = FatattrConfig::builder()
        .add(AttributeSet::VOLUME_LABEL)
        .verbose(true)
        .build()
        .unwrap();
    let r = run(volume(), &add, &["/mnt/A.TXT"]);
    assert_eq!(r.stdout, "---A-- => ---A-V  /mnt/A.TXT\n");
    assert_eq!(r.report.last_status, 0);

    let remove = FatattrConfig::builder()
        .remove(AttributeSet::VOLUME_LABEL)
        .verbose(true)
        .build()
        .unwrap();
    let mut out = Vec::new();
    let mut err = Vec::new();
    let report = Orchestrator::new(&r.channel, &remove, &mut out, &mut err).run(&["/mnt/A.TXT"]);
    assert_eq!(String::from_utf8(out).unwrap(), "---A-V => ---A-V  /mnt/A.TXT\n");
    assert_eq!(report.last_status, 0);
}

#[test]
fn round_trip_holds_outside_forced_bits() {
    let channel = AttributeChannel::new(volume());
    let dir = channel.open(Path::new("/mnt/sub")).unwrap();
    channel.add_attributes(&dir, AttributeSet::DIRECTORY).unwrap();
    channel.remove_attributes(&dir, AttributeSet::DIRECTORY).unwrap();
    assert_eq!(channel.get_attributes(&dir).unwrap().to_string(), "----D-");

    let forced = AttributeSet::DIRECTORY | AttributeSet::VOLUME_LABEL;
    let file = channel.open(Path::new("/mnt/A.TXT")).unwrap();
    let original = channel.get_attributes(&file).unwrap();
    let bits = forced | AttributeSet::HIDDEN;
    channel.add_attributes(&file, bits).unwrap();
    channel.remove_attributes(&file, bits).unwrap();
    let after = channel.get_attributes(&file).unwrap();
    assert_eq!(after.difference(forced), original.difference(forced));
    assert!(!after.contains(AttributeSet::DIRECTORY));
}
