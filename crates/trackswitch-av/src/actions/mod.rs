//! Media actions that rewrite files with ffmpeg.

mod switch_track;

pub use switch_track::{remux_args, switch_default_audio, SwitchOptions, SwitchTrackRequest};
