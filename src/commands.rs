//! The two wire-facing operations.
//!
//! Both report every outcome as [`OutwardMessage`]s; the returned
//! `io::Result` only fails when the message sink itself is broken.

use std::io::{self, Write};
use std::path::Path;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use trackswitch_av::{
    get_audio_tracks, switch_default_audio, SwitchOptions, SwitchTrackRequest,
};

use crate::config::Config;
use crate::message::{MessageWriter, OutwardMessage};

pub const TRACKS_RETRIEVED: &str = "Audio tracks retrieved successfully";
pub const TRACK_SWITCHED: &str = "Audio track switched successfully";

/// List the audio tracks of `video` as a single message.
pub async fn get_tracks<W: Write>(
    config: &Config,
    video: &Path,
    writer: &mut MessageWriter<W>,
) -> io::Result<()> {
    let message = match get_audio_tracks(&config.tools.ffprobe(), video).await {
        Ok(info) => {
            tracing::info!(
                "Found {} audio tracks in {:?}",
                info.audio_tracks.len(),
                video
            );
            match serde_json::to_value(&info) {
                Ok(data) => OutwardMessage::success(TRACKS_RETRIEVED, data),
                Err(e) => OutwardMessage::failure(format!("Failed to encode track list: {e}")),
            }
        }
        Err(e) => {
            tracing::warn!("Track listing failed for {:?}: {}", video, e);
            OutwardMessage::failure(e.to_string())
        }
    };

    writer.emit(&message)
}

/// Rewrite `input` to `output` with audio track `track_index` as default.
///
/// Emits a progress message per completed ffmpeg interval followed by
/// exactly one success or failure message.
pub async fn switch_track<W: Write>(
    config: &Config,
    input: &Path,
    track_index: u32,
    output: &Path,
    cancel: Option<CancellationToken>,
    writer: &mut MessageWriter<W>,
) -> io::Result<()> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            return writer.emit(&OutwardMessage::failure(format!(
                "Failed to create output directory: {e}"
            )));
        }
    }

    let request = SwitchTrackRequest::new(input, track_index, output);
    let options = SwitchOptions {
        timeout: config.remux.timeout(),
        cancel,
    };

    let mut sink_error: Option<io::Error> = None;
    let result = switch_default_audio(&config.tools.ffmpeg(), &request, options, |event| {
        if sink_error.is_some() {
            return;
        }
        if let Err(e) = writer.emit(&OutwardMessage::progress(event)) {
            tracing::error!("Failed to write progress: {}", e);
            sink_error = Some(e);
        }
    })
    .await;

    if let Some(e) = sink_error {
        return Err(e);
    }

    let message = match result {
        Ok(path) => OutwardMessage::success(
            TRACK_SWITCHED,
            json!({ "outputPath": path.to_string_lossy() }),
        ),
        Err(e) => OutwardMessage::failure(e.to_string()),
    };

    writer.emit(&message)
}
