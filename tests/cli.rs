use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

// Nothing listens on the discard port, so any request made here fails fast.
const DEAD_HOST: &str = "http://127.0.0.1:9";

fn run(binary: &str, dir: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let output = Command::new(binary)
        .current_dir(dir)
        .args(args)
        .env_remove("ALGOLIA_APPLICATION_ID")
        .env_remove("ALGOLIA_API_KEY")
        .env_remove("ALGOLIA_INDEX")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run {}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

fn feed_algolia(dir: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    run(env!("CARGO_BIN_EXE_feed-algolia"), dir, args)
}

fn log2json(dir: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    run(env!("CARGO_BIN_EXE_log2json"), dir, args)
}

#[test]
fn test_feed_without_arguments() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = feed_algolia(tmp.path(), &[]);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("ERROR: Must specify id, key, index, and source. See --help"));
    assert!(!stdout.contains("Processing:"));
}

#[test]
fn test_feed_with_some_arguments_fails_before_network() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = feed_algolia(
        tmp.path(),
        &["--id", "APP", "--key", "SECRET", "--index", "logs", "--host", DEAD_HOST],
    );
    assert_eq!(code, Some(1));
    assert!(stdout.contains("ERROR: Must specify"));
    assert!(!stdout.contains("Processing:"));
}

#[test]
fn test_feed_help_exits_one() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = feed_algolia(tmp.path(), &["--help"]);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("--source"));
    assert!(stdout.contains("Feed delicious JSON noms to Algolia."));
}

#[test]
fn test_feed_malformed_source() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("batch.json"), "[{\"a\": 1},").unwrap();

    let (stdout, stderr, code) = feed_algolia(
        tmp.path(),
        &["--id", "APP", "--key", "SECRET", "--index", "logs", "--source", "batch.json", "--host", DEAD_HOST],
    );
    assert_eq!(code, Some(1));
    assert!(stdout.contains("Processing: batch.json to logs"));
    assert!(stderr.contains("JSON error"), "stderr: {}", stderr);
}

#[test]
fn test_feed_unreachable_host() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("batch.json"), "[{\"a\": 1}]").unwrap();

    let (_, stderr, code) = feed_algolia(
        tmp.path(),
        &["--id", "APP", "--key", "SECRET", "--index", "logs", "--source", "batch.json", "--host", DEAD_HOST],
    );
    assert_eq!(code, Some(1));
    assert!(stderr.contains("HTTP error"), "stderr: {}", stderr);
}

#[test]
fn test_log2json_without_date() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = log2json(tmp.path(), &["-c", "ubuntu"]);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("ERROR: Must specify datestamp. See --help"));
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_log2json_help_exits_one() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = log2json(tmp.path(), &["-h"]);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("--channels"));
}

#[test]
fn test_log2json_failed_download_writes_no_output() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, code) = log2json(
        tmp.path(),
        &["--date", "2014-03-05", "--channels", "ubuntu,kubuntu", "--base-url", DEAD_HOST],
    );
    assert_eq!(code, Some(1));
    assert!(stdout.contains("Processing: http://127.0.0.1:9/2014/03/05/ubuntu.txt"));
    assert!(!stdout.contains("kubuntu.txt"));
    assert!(stderr.contains("Could not convert logs for 2014-03-05"), "stderr: {}", stderr);
    assert!(!tmp.path().join("2014-03-05.json").exists());
}
