#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const DEVICE: &str = "0000:00:00.0";

fn loopback_root(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "zonegw-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    let dev = root.join(DEVICE);
    std::fs::create_dir_all(&dev).expect("device dir should be creatable");
    std::fs::File::create(dev.join("resource0"))
        .and_then(|f| f.set_len(4096))
        .expect("resource should be creatable");
    std::os::unix::fs::symlink(dev.join("resource0"), dev.join("resource1"))
        .expect("symlink should be creatable");
    root
}

fn zonegw(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zonegw"))
        .env_remove("PCIE_DEVICE_ID")
        .env_remove("PCIE_VENDOR_ID")
        .env_remove("PCIE_SUBSYSTEM_ID")
        .arg("--log-level")
        .arg("error")
        .args(args)
        .arg("--device-root")
        .arg(root)
        .output()
        .expect("zonegw should run")
}

const IDS: [&str; 6] = [
    "--device-id",
    DEVICE,
    "--vendor-id",
    "0x1234",
    "--subsystem-id",
    "0x5678",
];

fn with_ids<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut all = args.to_vec();
    all.extend_from_slice(&IDS);
    all
}

#[test]
fn version_prints_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_zonegw"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("zonegw "));
}

#[test]
fn send_then_recv_prints_envelope() {
    let root = loopback_root("roundtrip");

    let sent = zonegw(
        &root,
        &with_ids(&["send", "--id", "0x123", "--data", "0001020304050607"]),
    );
    assert!(sent.status.success(), "{}", String::from_utf8_lossy(&sent.stderr));

    let recv = zonegw(&root, &with_ids(&["--format", "json", "recv"]));
    assert!(recv.status.success(), "{}", String::from_utf8_lossy(&recv.stderr));
    let stdout = String::from_utf8_lossy(&recv.stdout);
    assert!(stdout.contains("\"zone_id\":1"));
    assert!(stdout.contains("\"device_id\":42"));
    assert!(stdout.contains("\"message_id\":291"));
    assert!(stdout.contains("\"protocol\":\"CAN\""));
    assert!(stdout.contains("\"data\":\"0001020304050607\""));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn uplink_with_count_forwards_frames() {
    let root = loopback_root("uplink");

    let up = zonegw(
        &root,
        &with_ids(&[
            "--format", "json", "uplink", "--count", "2", "--interval", "0ms",
        ]),
    );
    assert!(up.status.success(), "{}", String::from_utf8_lossy(&up.stderr));
    assert!(String::from_utf8_lossy(&up.stdout).contains("\"forwarded\":2"));

    // The region holds the second simulated frame.
    let recv = zonegw(&root, &with_ids(&["--format", "json", "recv"]));
    assert!(recv.status.success());
    assert!(String::from_utf8_lossy(&recv.stdout).contains("\"data\":\"0102030405060708\""));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn downlink_with_count_delivers_frame() {
    let root = loopback_root("downlink");
    let sent = zonegw(&root, &with_ids(&["send", "--id", "0x123", "--data", "AA"]));
    assert!(sent.status.success());

    let down = zonegw(
        &root,
        &with_ids(&["--format", "json", "downlink", "--count", "1"]),
    );
    assert!(down.status.success(), "{}", String::from_utf8_lossy(&down.stderr));
    assert!(String::from_utf8_lossy(&down.stdout).contains("\"forwarded\":1"));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_subsystem_id_is_usage_error() {
    let root = loopback_root("nocfg");
    let output = zonegw(
        &root,
        &[
            "send",
            "--id",
            "1",
            "--device-id",
            DEVICE,
            "--vendor-id",
            "0x1234",
        ],
    );
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("subsystem_id"));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn oversized_can_payload_is_usage_error() {
    let root = loopback_root("dlc");
    let output = zonegw(
        &root,
        &with_ids(&["send", "--id", "0x123", "--data", "000102030405060708"]),
    );
    assert_eq!(output.status.code(), Some(64));
    // Nothing reached the backbone.
    let region = std::fs::read(root.join(DEVICE).join("resource0")).unwrap();
    assert!(region.iter().all(|b| *b == 0));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_device_is_transport_error() {
    let root = loopback_root("nodev");
    let output = zonegw(
        &root,
        &[
            "recv",
            "--device-id",
            "0000:ff:00.0",
            "--vendor-id",
            "v",
            "--subsystem-id",
            "s",
        ],
    );
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn empty_region_is_data_invalid() {
    let root = loopback_root("empty");
    let output = zonegw(&root, &with_ids(&["recv"]));
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_dir_all(&root);
}
