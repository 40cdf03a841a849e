//! Workspace fixtures for CLI tests: profile files plus shell deciders.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const GOOD_PROFILE: &str = "\
func_a:100:2
 1: 2
func_b:200:4
 1: 4
func_d:50:5
 1: 5
";

pub const BAD_PROFILE: &str = "\
func_a:100:1
 1: 1
func_b:200:3
 1: 3
func_c:50:5
 1: 5
";

/// BAD when either func_a or func_b carries its bad header.
pub const EITHER_BAD_DECIDER: &str = "\
if grep -q '^func_a:100:1$' \"$1\" || grep -q '^func_b:200:3$' \"$1\"; then exit 1; fi
exit 0";

/// BAD only when both carry their bad headers.
pub const BOTH_BAD_DECIDER: &str = "\
if grep -q '^func_a:100:1$' \"$1\" && grep -q '^func_b:200:3$' \"$1\"; then exit 1; fi
exit 0";

pub struct Workspace {
    pub good: PathBuf,
    pub bad: PathBuf,
    pub decider: PathBuf,
    pub output: PathBuf,
    pub state: PathBuf,
}

/// Lay out profiles and an executable decider script under `root`.
pub fn workspace(root: &Path, decider_body: &str) -> Workspace {
    let good = root.join("good.txt");
    let bad = root.join("bad.txt");
    fs::write(&good, GOOD_PROFILE).expect("write good profile");
    fs::write(&bad, BAD_PROFILE).expect("write bad profile");
    let decider = write_decider(root, "decider.sh", decider_body);
    Workspace {
        good,
        bad,
        decider,
        output: root.join("report.json"),
        state: root.join("afdo_analysis_state.json"),
    }
}

pub fn write_decider(root: &Path, name: &str, body: &str) -> PathBuf {
    let path = root.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write decider");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("decider metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod decider");
    }
    path
}

pub fn read_report(path: &Path) -> serde_json::Value {
    let body = fs::read_to_string(path).expect("read report");
    serde_json::from_str(&body).expect("parse report")
}

/// Files in `dir` whose name starts with `prefix`.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with(prefix)).unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}
