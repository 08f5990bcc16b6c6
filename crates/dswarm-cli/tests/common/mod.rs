//! Common test utilities for CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TRIM_JOB: &str = r#"{
    "id": "t1",
    "name": "trim title",
    "components": [
        {"id": "S1", "type": "source", "outputs": ["F1"],
         "parameters": {"path": {"data": "S1path"}}},
        {"id": "F1", "name": "trim", "type": "fun", "inputs": ["S1"], "outputs": ["T1"]},
        {"id": "T1", "type": "target", "inputs": ["F1"],
         "parameters": {"path": {"data": "title"}}}
    ]
}"#;

/// A dangling input on F1 and a target with outputs
pub const BROKEN_JOB: &str = r#"{
    "id": "t9",
    "components": [
        {"id": "S1", "type": "source", "outputs": ["F1"],
         "parameters": {"path": {"data": "S1path"}}},
        {"id": "F1", "name": "trim", "type": "fun", "inputs": ["S1", "S7"], "outputs": ["T1"]},
        {"id": "T1", "type": "target", "inputs": ["F1"], "outputs": ["F1"],
         "parameters": {"path": {"data": "title"}}}
    ]
}"#;

/// Structurally sound, but `replace` gets a pattern that does not parse
pub const BAD_PATTERN_JOB: &str = r#"{
    "id": "t4",
    "components": [
        {"id": "S1", "type": "source", "outputs": ["F1"],
         "parameters": {"path": {"data": "S1path"}}},
        {"id": "F1", "type": "fun", "inputs": ["S1"], "outputs": ["T1"],
         "parameters": {"function": {"data": "replace"},
                        "pattern": {"data": "("}, "with": {"data": "x"}}},
        {"id": "T1", "type": "target", "inputs": ["F1"],
         "parameters": {"path": {"data": "b"}}}
    ]
}"#;

pub const JSON_RECORDS: &str = r#"[{"S1path": " hello "}, {"S1path": "  world"}]"#;

pub const CSV_RECORDS: &str = "id;title\nb1;Faust\nb2;Woyzeck\n";

/// Temp directory holding test inputs
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// `dswarm` with logging silenced
pub fn dswarm() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dswarm"));
    cmd.args(["--log-level", "off"]);
    cmd
}
