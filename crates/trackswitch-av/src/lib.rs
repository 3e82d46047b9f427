//! # trackswitch-av
//!
//! Audio track probing and default-track remuxing for video files.
//!
//! This crate provides:
//!
//! - **Tool resolution** ([`tools`]) -- locate ffmpeg and ffprobe, honouring
//!   configured overrides.
//! - **Track enumeration** ([`get_audio_tracks`]) -- list the audio streams
//!   of a file via ffprobe.
//! - **Progress parsing** ([`progress`]) -- turn ffmpeg `-progress` output
//!   into percentage events while the process runs.
//! - **Track switching** ([`switch_default_audio`]) -- supervise an ffmpeg
//!   remux that marks one audio stream default.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use trackswitch_av::{switch_default_audio, SwitchOptions, SwitchTrackRequest};
//!
//! # async fn example() -> trackswitch_av::Result<()> {
//! let request = SwitchTrackRequest::new("/media/movie.mkv", 1, "/media/out/movie.mkv");
//! let output = switch_default_audio(
//!     Path::new("ffmpeg"),
//!     &request,
//!     SwitchOptions::default(),
//!     |event| println!("{:.1}%", event.percent),
//! )
//! .await?;
//! println!("wrote {}", output.display());
//! # Ok(())
//! # }
//! ```

pub mod actions;
mod error;
pub mod probe;
pub mod progress;
pub mod tools;

// Re-exports
pub use actions::{switch_default_audio, SwitchOptions, SwitchTrackRequest};
pub use error::{Error, Result};
pub use probe::{get_audio_tracks, AudioTrack, VideoInfo};
pub use progress::{ProgressDemuxer, ProgressEvent, ProgressRecord};
pub use tools::{check_tools, ToolInfo, ToolSource, ToolsConfig};
