//! Error types for trackswitch-av.

use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving ffprobe/ffmpeg.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external tool could not be started.
    #[error("failed to start {tool}: {message}")]
    Launch { tool: String, message: String },

    /// Reading the tool's progress channel failed before end-of-stream.
    #[error("error reading {tool} output: {source}")]
    StreamRead {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited abnormally.
    ///
    /// `diagnostic` is whatever the tool wrote to stderr; it may be empty.
    #[error("{tool} error: {status}\nOutput: {diagnostic}")]
    ExternalProcess {
        tool: String,
        status: String,
        diagnostic: String,
    },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    MalformedOutput { tool: String, message: String },

    /// The tool ran longer than the configured limit and was killed.
    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    /// The operation was cancelled and the tool was killed.
    #[error("{tool} was cancelled")]
    Cancelled { tool: String },
}

impl Error {
    /// Create a launch error.
    pub fn launch(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Launch {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a stream read error.
    pub fn stream_read(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::StreamRead {
            tool: tool.into(),
            source,
        }
    }

    /// Create an external process error.
    pub fn external_process(
        tool: impl Into<String>,
        status: impl Into<String>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self::ExternalProcess {
            tool: tool.into(),
            status: status.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// Create a malformed output error.
    pub fn malformed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
