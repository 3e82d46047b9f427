//! Audio track enumeration.

mod ffprobe;

pub use ffprobe::{get_audio_tracks, parse_ffprobe_output};

use serde::{Deserialize, Serialize};

/// One audio stream of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Absolute stream index as reported by ffprobe.
    pub index: u32,
    pub language: String,
    pub title: String,
    pub codec: String,
}

/// Audio track listing for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub file_path: String,
    pub audio_tracks: Vec<AudioTrack>,
}
