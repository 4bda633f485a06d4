// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const TABLET_LABEL: &str =
    "Take 1 tablet twice daily with food. Do not exceed 2 tablets in 24 hours.";

fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

/// Runs the binary inside `dir` with no user config, colors or API key.
fn medassist(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medassist"));
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("OPENAI_API_KEY")
        .env_remove("MEDASSIST_LOG");
    cmd
}

fn json_stdout(assert: assert_cmd::assert::Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    serde_json::from_str(&stdout).expect("json output")
}

#[test]
fn context_returns_dosing_passage_first() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    let assert = medassist(&dir)
        .args([
            "--format",
            "json",
            "--provider",
            "hash",
            "--chunk-size",
            "40",
            "--chunk-overlap",
            "10",
            "context",
            "-d",
            "ibuprofen",
            "-q",
            "How often should I take this?",
            "-k",
            "1",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .success();

    let value = json_stdout(assert);
    assert_eq!(value["status"], "retrieved");
    assert_eq!(value["drug"], "ibuprofen");
    assert_eq!(value["chunk_count"], 1);
    let context = value["context"].as_str().expect("context");
    assert!(context.contains("twice daily"));
    assert_eq!(value["passages"][0]["index"], 0);
}

#[test]
fn context_text_output_lists_passages() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "--chunk-size",
            "40",
            "--chunk-overlap",
            "10",
            "context",
            "-d",
            "ibuprofen",
            "-q",
            "How often should I take this?",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("#0 @0 score="))
        .stdout(predicate::str::contains("twice daily"));
}

#[test]
fn blank_label_reports_not_found() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), "   \n");

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "context",
            "-d",
            "unknownium",
            "-q",
            "dose?",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No drug information found for unknownium"));
}

#[test]
fn missing_label_file_is_a_lookup_failure() {
    let dir = TempDir::new().expect("tempdir");

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "context",
            "-d",
            "ibuprofen",
            "-q",
            "dose?",
            "--label-file",
            "missing.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Drug label service is temporarily unavailable",
        ));
}

#[test]
fn invalid_chunking_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    medassist(&dir)
        .args([
            "--chunk-size",
            "10",
            "--chunk-overlap",
            "10",
            "chunk",
            "-f",
            "label.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be less than chunk size"));
}

#[test]
fn zero_top_k_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "context",
            "-d",
            "ibuprofen",
            "-q",
            "How often should I take this?",
            "-k",
            "0",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error processing drug info"))
        .stderr(predicate::str::contains("k must be greater than 0"));
}

#[test]
fn zero_top_k_in_config_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);
    write_file(&dir.path().join(".medassistrc.toml"), "[retrieval]\ntop_k = 0\n");

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "context",
            "-d",
            "ibuprofen",
            "-q",
            "dose?",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_k must be greater than 0"));
}

#[test]
fn chunk_prints_overlapping_windows() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    let assert = medassist(&dir)
        .args([
            "--format",
            "json",
            "--chunk-size",
            "40",
            "--chunk-overlap",
            "10",
            "chunk",
            "-f",
            "label.txt",
        ])
        .assert()
        .success();

    let value = json_stdout(assert);
    let chunks = value.as_array().expect("array");
    assert_eq!(chunks.len(), 3);
    let starts: Vec<u64> = chunks
        .iter()
        .map(|c| c["char_start"].as_u64().expect("start"))
        .collect();
    assert_eq!(starts, vec![0, 30, 60]);
}

#[test]
fn config_file_sets_chunking() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);
    write_file(
        &dir.path().join(".medassistrc.toml"),
        "[retrieval]\nchunk_size = 40\nchunk_overlap = 10\n",
    );

    let assert = medassist(&dir)
        .args(["--format", "json", "chunk", "-f", "label.txt"])
        .assert()
        .success();
    assert_eq!(json_stdout(assert).as_array().expect("array").len(), 3);
}

#[test]
fn batch_context_keeps_input_order() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);
    write_file(
        &dir.path().join("questions.tsv"),
        "# drug\tquestion\nibuprofen\tHow often should I take this?\naspirin\tHow many tablets in 24 hours?\nnaproxen\tWith food?\n",
    );

    let assert = medassist(&dir)
        .args([
            "--format",
            "json",
            "--provider",
            "hash",
            "--chunk-size",
            "40",
            "--chunk-overlap",
            "10",
            "batch",
            "-f",
            "questions.tsv",
            "-k",
            "1",
            "--context-only",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .success();

    let value = json_stdout(assert);
    let results = value.as_array().expect("array");
    let drugs: Vec<&str> = results
        .iter()
        .map(|r| r["drug"].as_str().expect("drug"))
        .collect();
    assert_eq!(drugs, vec!["ibuprofen", "aspirin", "naproxen"]);
    assert!(results.iter().all(|r| r["status"] == "retrieved"));
}

#[test]
fn ask_without_api_key_fails() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("label.txt"), TABLET_LABEL);

    medassist(&dir)
        .args([
            "--provider",
            "hash",
            "ask",
            "-d",
            "ibuprofen",
            "-q",
            "dose?",
            "--label-file",
            "label.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY is not set"));
}

#[test]
fn remind_emits_json_schedule() {
    let dir = TempDir::new().expect("tempdir");

    let assert = medassist(&dir)
        .args([
            "--format",
            "json",
            "remind",
            "--medicine",
            "Amoxicillin",
            "--dose",
            "500mg",
            "--frequency",
            "3 times/day",
            "--times",
            "8am, 2pm,8:30pm",
        ])
        .assert()
        .success();

    let value = json_stdout(assert);
    assert_eq!(value["medicine"], "Amoxicillin");
    assert_eq!(value["reminder_times"][1], "2pm");
    assert_eq!(value["schedule"][2]["hour"], 20);
    assert_eq!(value["schedule"][2]["minute"], 30);
}

#[test]
fn remind_rejects_bad_time() {
    let dir = TempDir::new().expect("tempdir");

    medassist(&dir)
        .args([
            "remind",
            "--medicine",
            "Amoxicillin",
            "--dose",
            "500mg",
            "--frequency",
            "daily",
            "--times",
            "25pm",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("25pm"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().expect("tempdir");

    medassist(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("medassist"));
}
