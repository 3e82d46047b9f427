//! FFprobe-based audio stream listing.

use super::{AudioTrack, VideoInfo};
use crate::tools::FFPROBE;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_name: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

/// List the audio streams of `path` using the ffprobe at `ffprobe`.
pub async fn get_audio_tracks(ffprobe: &Path, path: &Path) -> Result<VideoInfo> {
    tracing::debug!("Probing audio streams of {:?} with {:?}", path, ffprobe);

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "a",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::launch(FFPROBE, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::external_process(
            FFPROBE,
            output.status.to_string(),
            stderr.trim(),
        ));
    }

    parse_ffprobe_output(path, &output.stdout)
}

/// Map raw ffprobe JSON to a [`VideoInfo`].
pub fn parse_ffprobe_output(path: &Path, json: &[u8]) -> Result<VideoInfo> {
    let output: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| Error::malformed(FFPROBE, e.to_string()))?;

    let audio_tracks = output
        .streams
        .into_iter()
        .map(|stream| AudioTrack {
            index: stream.index,
            language: stream.tags.language.unwrap_or_default(),
            title: stream.tags.title.unwrap_or_default(),
            codec: stream.codec_name.unwrap_or_default(),
        })
        .collect();

    Ok(VideoInfo {
        file_path: path.to_string_lossy().into_owned(),
        audio_tracks,
    })
}
