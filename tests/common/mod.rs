//! Shared helpers for CLI integration tests.
//!
//! Fake `ffmpeg`/`ffprobe` executables are small shell scripts written into
//! a temp directory and wired in through a config file.

#![allow(dead_code)]

use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get a command for the trackswitch binary
#[allow(deprecated)]
pub fn trackswitch_cmd() -> Command {
    let mut cmd = Command::cargo_bin("trackswitch").unwrap();
    // Keep the test environment's own config files out of the way.
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

/// Write an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Write a config file pointing at the given tools.
pub fn write_config(
    dir: &Path,
    ffmpeg: Option<&Path>,
    ffprobe: Option<&Path>,
    extra: &str,
) -> PathBuf {
    let quote = |p: &Path| toml::Value::String(p.display().to_string()).to_string();

    let mut content = String::from("[tools]\n");
    if let Some(p) = ffmpeg {
        content.push_str(&format!("ffmpeg_path = {}\n", quote(p)));
    }
    if let Some(p) = ffprobe {
        content.push_str(&format!("ffprobe_path = {}\n", quote(p)));
    }
    content.push_str(extra);

    let path = dir.join("trackswitch.toml");
    std::fs::write(&path, content).unwrap();
    path
}

/// Parse every stdout line as JSON. Panics on a non-JSON line.
pub fn messages(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| {
            serde_json::from_str(line).unwrap_or_else(|e| panic!("not JSON ({e}): {line}"))
        })
        .collect()
}

pub fn is_progress(message: &Value) -> bool {
    message["message"] == "progress"
}
