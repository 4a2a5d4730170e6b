//! CLI tests for `revise prompt` and `revise config`.
//!
//! Spawns the binary and checks that the prompt debug view is deterministic
//! and that config defaults are reported.

use std::fs;
use std::process::{Command, Output};

fn revise(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_revise"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run revise")
}

#[test]
fn prompt_output_is_byte_identical_across_runs() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("current.html"), "<button>Go</button>").expect("write html");
    let args = [
        "prompt",
        "--query",
        "a red button",
        "--feedback",
        "make it blue",
        "--html-file",
        "current.html",
    ];

    let first = revise(temp.path(), &args);
    let second = revise(temp.path(), &args);

    assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    assert_eq!(first.stdout, second.stdout);
    let text = String::from_utf8(first.stdout).expect("utf8");
    assert!(text.contains("a red button"));
    assert!(text.contains("make it blue"));
    assert!(text.contains("<button>Go</button>"));
}

#[test]
fn prompt_with_missing_html_file_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = revise(
        temp.path(),
        &["prompt", "--query", "q", "--html-file", "nope.html"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.html"));
}

#[test]
fn config_prints_defaults_when_file_missing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = revise(temp.path(), &["config"]);
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert!(text.contains("base_url = \"http://127.0.0.1:3000\""));
    assert!(text.contains("labels = \"derived\""));
    assert!(text.contains("[storage]"));
}

#[test]
fn config_rejects_invalid_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("revise.toml"), "labels = \"sometimes\"\n").expect("write");
    let output = revise(temp.path(), &["config"]);
    assert_eq!(output.status.code(), Some(1));
}
