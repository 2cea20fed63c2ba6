//! Concurrency tests for the heritage binary.
//!
//! These tests verify that multiple processes can safely write to and read
//! from the same database file.

use assert_cmd::Command;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("heritage"));
    cmd.env_remove("HERITAGE_USER")
        .env_remove("HERITAGE_PASSWORD")
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "").expect("Failed to write config");
    cli(temp_dir.path()).arg("init").assert().success();
    temp_dir
}

fn read_db(dir: &Path) -> serde_json::Value {
    let contents =
        std::fs::read_to_string(dir.join("data/museum.json")).expect("Failed to read database");
    serde_json::from_str(&contents).expect("Database is not valid JSON")
}

#[test]
fn test_concurrent_artefact_writes() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["-u", "admin", "--password", "admin123"])
                    .args(["artefact", "add", "--name"])
                    .arg(format!("Artefact {}", i))
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let db = read_db(&dir);
    let artefacts = db["artefacts"].as_array().unwrap();
    assert_eq!(artefacts.len(), 5, "Expected 5 artefacts, got {}", artefacts.len());

    let mut ids: Vec<u64> = artefacts.iter().map(|a| a["id"].as_u64().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let writer = {
        let dir = dir.clone();
        thread::spawn(move || {
            for i in 0..3 {
                cli(&dir)
                    .args(["-u", "admin", "--password", "admin123"])
                    .args(["exhibit", "add", "--title"])
                    .arg(format!("Exhibit {}", i))
                    .assert()
                    .success();
            }
        })
    };

    // Readers never see a half-written file
    for _ in 0..3 {
        cli(&dir)
            .args(["-u", "admin", "--password", "admin123"])
            .args(["exhibit", "list"])
            .assert()
            .success();
    }

    writer.join().expect("Writer panicked");
    assert_eq!(read_db(&dir)["exhibits"].as_array().unwrap().len(), 3);
}
