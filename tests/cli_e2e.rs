use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn accelbits_bin() -> &'static str {
    env!("CARGO_BIN_EXE_accelbits")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("accelbits-cli-e2e-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_accelbits(args: &[&str]) -> Output {
    Command::new(accelbits_bin())
        .args(args)
        .output()
        .expect("run accelbits")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn cli_pack_int5_prints_hex_and_padding() {
    let out = run_accelbits(&["pack", "--dtype", "INT5", "-3", "2", "1", "-1"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout(&out), "5d840f\npadding: 4\n");
}

#[test]
fn cli_unpack_hex_prints_values() {
    let out = run_accelbits(&["unpack", "--dtype", "INT5", "--padding", "4", "5d840f"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout(&out).trim(), "-3 2 1 -1");
}

#[test]
fn cli_fixed_point_roundtrip() {
    let out = run_accelbits(&["pack", "--dtype", "FIXED<8,4>", "1.5", "-0.25"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "18fc\npadding: 0\n");

    let out = run_accelbits(&["unpack", "--dtype", "fixed<8,4>", "18fc"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "1.5 -0.25");
}

#[test]
fn cli_pack_to_file_then_unpack_file() {
    let dir = test_temp_dir("file");
    let bin = dir.join("stream.bin");
    let bin_str = bin.to_str().expect("utf8 path");

    let out = run_accelbits(&["pack", "--dtype", "UINT12", "-o", bin_str, "4095", "0", "17"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout(&out), "padding: 4\n");
    assert_eq!(fs::read(&bin).expect("read stream").len(), 5);

    let out = run_accelbits(&["unpack", "--dtype", "UINT12", "--padding", "4", "-i", bin_str]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout(&out).trim(), "4095 0 17");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_info_reports_range() {
    let out = run_accelbits(&["info", "--dtype", "INT5"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("bitwidth:  5"), "{text}");
    assert!(text.contains("min:       -16"), "{text}");
    assert!(text.contains("max:       15"), "{text}");
}

#[test]
fn cli_unpack_bad_padding_fails() {
    let out = run_accelbits(&["unpack", "--dtype", "INT5", "--padding", "3", "5d840f"]);
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("bit length mismatch"), "{err}");
}

#[test]
fn cli_rejects_unknown_dtype() {
    let out = run_accelbits(&["info", "--dtype", "INT65"]);
    assert!(!out.status.success());
}
