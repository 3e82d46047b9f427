use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trackswitch")]
#[command(author, version, about = "Switch the default audio track of video files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the audio tracks of a video file as JSON
    GetTracks {
        /// Video file to inspect
        video: PathBuf,
    },

    /// Remux a video file with the chosen audio track marked default
    SwitchTrack {
        /// Input video file
        input: PathBuf,

        /// Index of the audio track to make default (among audio streams)
        track_index: u32,

        /// Where to write the remuxed file
        output: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Display version information
    Version,
}
