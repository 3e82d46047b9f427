//! External tool detection and path resolution.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the remux tool.
pub const FFMPEG: &str = "ffmpeg";
/// Name of the inspection tool.
pub const FFPROBE: &str = "ffprobe";

/// Optional overrides for tool locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Resolved path to ffmpeg.
    pub fn ffmpeg(&self) -> PathBuf {
        resolve_tool(FFMPEG, self.ffmpeg_path.as_deref())
    }

    /// Resolved path to ffprobe.
    pub fn ffprobe(&self) -> PathBuf {
        resolve_tool(FFPROBE, self.ffprobe_path.as_deref())
    }
}

/// Where a tool's path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    /// The path set under `[tools]` in the config file.
    Configured,
    /// Found on `PATH`.
    Path,
    /// Not found anywhere; the bare name is used.
    Unresolved,
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Configured => "configured",
            Self::Path => "PATH",
            Self::Unresolved => "not found",
        })
    }
}

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
    pub source: ToolSource,
    /// A configured path that does not exist and was skipped.
    pub missing_override: Option<PathBuf>,
}

/// Find a tool, preferring a configured path over PATH lookup.
pub fn locate_tool(name: &str, configured: Option<&Path>) -> (PathBuf, ToolSource) {
    if let Some(path) = configured {
        if path.exists() {
            return (path.to_path_buf(), ToolSource::Configured);
        }
        tracing::warn!("Configured {} path does not exist: {:?}", name, path);
    }

    match which::which(name) {
        Ok(path) => (path, ToolSource::Path),
        Err(_) => (PathBuf::from(name), ToolSource::Unresolved),
    }
}

/// Get the path to a tool.
///
/// Never fails: when nothing is found the bare name is returned so that the
/// spawn itself reports the problem.
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    locate_tool(name, configured).0
}

/// Check if a tool is available and get its information.
///
/// ffmpeg and ffprobe take `-version` rather than `--version`.
pub fn check_tool(name: &str, configured: Option<&Path>) -> ToolInfo {
    let (program, source) = locate_tool(name, configured);
    let missing_override = configured
        .filter(|_| source != ToolSource::Configured)
        .map(Path::to_path_buf);

    let version = match Command::new(&program).arg("-version").output() {
        Ok(output) if output.status.success() => Some(
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
        ),
        _ => None,
    };

    ToolInfo {
        name: name.to_string(),
        available: version.is_some(),
        version: version.flatten(),
        path: (source != ToolSource::Unresolved).then_some(program),
        source,
        missing_override,
    }
}

/// Check both media tools this crate drives.
pub fn check_tools(config: &ToolsConfig) -> Vec<ToolInfo> {
    vec![
        check_tool(FFMPEG, config.ffmpeg_path.as_deref()),
        check_tool(FFPROBE, config.ffprobe_path.as_deref()),
    ]
}
