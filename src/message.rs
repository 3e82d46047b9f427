//! JSON-lines messages written to stdout.
//!
//! Every line is one [`OutwardMessage`]. Callers tell progress apart from
//! the final outcome by `message == "progress"`, and success from failure by
//! the `success` field; the process exit code carries no information.

use std::io::{self, Stdout, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use trackswitch_av::ProgressEvent;

/// `message` value of progress lines.
pub const PROGRESS: &str = "progress";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutwardMessage {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OutwardMessage {
    /// `{"success":true,"message":"progress","data":{"progress":<percent>}}`
    pub fn progress(event: ProgressEvent) -> Self {
        Self {
            success: true,
            message: Some(PROGRESS.to_string()),
            data: Some(json!({ "progress": event.percent })),
        }
    }

    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_progress(&self) -> bool {
        self.message.as_deref() == Some(PROGRESS)
    }
}

/// Writes one complete message per line.
///
/// Each message is serialized in full before anything is written, so a
/// serialization failure never leaves a partial line behind.
pub struct MessageWriter<W> {
    out: W,
}

impl MessageWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> MessageWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit(&mut self, message: &OutwardMessage) -> io::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.out.write_all(&line)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
