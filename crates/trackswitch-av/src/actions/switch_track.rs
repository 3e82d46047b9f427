//! Default audio track switching with ffmpeg.
//!
//! ffmpeg copies every stream into the output, clears the default flag on
//! all audio streams and sets it on the requested one. Progress is read from
//! ffmpeg's stdout (`-progress pipe:1`) while stderr is collected in the
//! background for error reporting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressDemuxer, ProgressEvent};
use crate::tools::FFMPEG;
use crate::{Error, Result};

/// Only the tail of ffmpeg's stderr is kept; the error is at the end.
const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

/// How long to wait for stderr to close once ffmpeg has exited. A process
/// ffmpeg spawned can hold the pipe open long after ffmpeg is gone.
const DIAGNOSTIC_GRACE: Duration = Duration::from_secs(2);

/// A request to rewrite `input` into `output` with audio stream
/// `track_index` marked default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTrackRequest {
    pub input: PathBuf,
    /// Index among the audio streams (`-disposition:a:<n>`).
    pub track_index: u32,
    pub output: PathBuf,
}

impl SwitchTrackRequest {
    pub fn new(input: impl Into<PathBuf>, track_index: u32, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            track_index,
            output: output.into(),
        }
    }
}

/// Limits on a running remux. The default runs to completion.
#[derive(Debug, Clone, Default)]
pub struct SwitchOptions {
    /// Kill ffmpeg if it runs longer than this.
    pub timeout: Option<Duration>,
    /// Kill ffmpeg when this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

/// Build the ffmpeg argument list for `request`.
pub fn remux_args(request: &SwitchTrackRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(16);
    args.push("-i".into());
    args.push(request.input.clone().into_os_string());
    args.extend(["-map", "0", "-c", "copy", "-disposition:a", "0"].map(OsString::from));
    args.push(format!("-disposition:a:{}", request.track_index).into());
    args.push("default".into());
    args.push("-y".into());
    args.extend(["-progress", "pipe:1"].map(OsString::from));
    args.push(request.output.clone().into_os_string());
    args
}

enum Interrupt {
    Timeout(Duration),
    Cancelled,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    ReadFailed(std::io::Error),
    Interrupted(Interrupt),
}

/// Remux `request` with the ffmpeg at `ffmpeg`, calling `on_progress` for
/// every completed progress interval.
///
/// Progress events are delivered in order and before this function returns.
/// On success the output path is returned.
///
/// # Errors
///
/// - [`Error::Launch`] if ffmpeg cannot be spawned.
/// - [`Error::StreamRead`] if reading the progress channel fails; ffmpeg is
///   killed.
/// - [`Error::ExternalProcess`] if ffmpeg exits unsuccessfully. The
///   diagnostic is ffmpeg's stderr, or empty if it could not be collected.
/// - [`Error::Timeout`] / [`Error::Cancelled`] if `options` stopped the run.
pub async fn switch_default_audio(
    ffmpeg: &Path,
    request: &SwitchTrackRequest,
    options: SwitchOptions,
    mut on_progress: impl FnMut(ProgressEvent),
) -> Result<PathBuf> {
    tracing::info!(
        "Switching default audio track: {:?} -> {:?} (track={})",
        request.input,
        request.output,
        request.track_index
    );

    let mut child = Command::new(ffmpeg)
        .args(remux_args(request))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::launch(FFMPEG, e.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::launch(FFMPEG, "stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::launch(FFMPEG, "stderr was not captured"))?;

    // Drained for the whole run so ffmpeg never blocks on a full stderr pipe.
    let diagnostics = tokio::spawn(collect_diagnostics(stderr));

    supervise(
        &mut child,
        BufReader::new(stdout),
        diagnostics,
        &request.output,
        &options,
        &mut on_progress,
    )
    .await
}

/// Drive a spawned ffmpeg to one of its outcomes.
///
/// `progress` is ffmpeg's progress channel and `diagnostics` the task
/// collecting its stderr.
async fn supervise<R: AsyncBufRead + Unpin>(
    child: &mut Child,
    progress: R,
    diagnostics: JoinHandle<String>,
    output: &Path,
    options: &SwitchOptions,
    on_progress: &mut impl FnMut(ProgressEvent),
) -> Result<PathBuf> {
    let outcome = tokio::select! {
        outcome = drain_then_wait(child, progress, on_progress) => outcome,
        interrupt = interrupted(options) => Outcome::Interrupted(interrupt),
    };

    match outcome {
        Outcome::Exited(Ok(status)) if status.success() => {
            diagnostics.abort();
            tracing::info!("Remux complete: {:?}", output);
            Ok(output.to_path_buf())
        }
        Outcome::Exited(Ok(status)) => {
            let diagnostic = join_diagnostics(diagnostics).await;
            tracing::warn!("ffmpeg exited with {}", status);
            Err(Error::external_process(
                FFMPEG,
                status.to_string(),
                diagnostic.trim(),
            ))
        }
        Outcome::Exited(Err(e)) => {
            let diagnostic = join_diagnostics(diagnostics).await;
            tracing::error!("Failed to wait for ffmpeg: {}", e);
            Err(Error::external_process(
                FFMPEG,
                e.to_string(),
                diagnostic.trim(),
            ))
        }
        Outcome::ReadFailed(e) => {
            tracing::error!("Failed to read ffmpeg progress: {}", e);
            kill_and_reap(child).await;
            diagnostics.abort();
            Err(Error::stream_read(FFMPEG, e))
        }
        Outcome::Interrupted(interrupt) => {
            kill_and_reap(child).await;
            diagnostics.abort();
            match interrupt {
                Interrupt::Timeout(after) => {
                    tracing::warn!("ffmpeg timed out after {:?}", after);
                    Err(Error::Timeout {
                        tool: FFMPEG.to_string(),
                        after,
                    })
                }
                Interrupt::Cancelled => {
                    tracing::warn!("ffmpeg cancelled");
                    Err(Error::Cancelled {
                        tool: FFMPEG.to_string(),
                    })
                }
            }
        }
    }
}

/// Read progress to end-of-stream, and only then wait for exit.
async fn drain_then_wait<R: AsyncBufRead + Unpin>(
    child: &mut Child,
    progress: R,
    on_progress: &mut impl FnMut(ProgressEvent),
) -> Outcome {
    let mut events = ProgressDemuxer::new(progress);

    loop {
        match events.next_event().await {
            Ok(Some(event)) => {
                tracing::trace!("ffmpeg progress: {:.2}%", event.percent);
                on_progress(event);
            }
            Ok(None) => break,
            Err(e) => return Outcome::ReadFailed(e),
        }
    }

    Outcome::Exited(child.wait().await)
}

async fn interrupted(options: &SwitchOptions) -> Interrupt {
    let timeout = async {
        match options.timeout {
            Some(after) => {
                tokio::time::sleep(after).await;
                after
            }
            None => std::future::pending().await,
        }
    };

    let cancel = async {
        match &options.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        after = timeout => Interrupt::Timeout(after),
        () = cancel => Interrupt::Cancelled,
    }
}

/// Collect stderr until it closes, keeping at most [`MAX_DIAGNOSTIC_BYTES`].
///
/// A read error ends collection with whatever was gathered so far.
async fn collect_diagnostics(mut stderr: ChildStderr) -> String {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                collected.extend_from_slice(&chunk[..n]);
                if collected.len() > MAX_DIAGNOSTIC_BYTES {
                    let excess = collected.len() - MAX_DIAGNOSTIC_BYTES;
                    collected.drain(..excess);
                }
            }
            Err(e) => {
                tracing::debug!("Stopped reading ffmpeg stderr: {}", e);
                break;
            }
        }
    }

    String::from_utf8_lossy(&collected).into_owned()
}

/// Wait up to [`DIAGNOSTIC_GRACE`] for the collected stderr. Gives up with an
/// empty diagnostic rather than hang on a pipe that never closes.
async fn join_diagnostics(mut handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(DIAGNOSTIC_GRACE, &mut handle).await {
        Ok(Ok(diagnostic)) => diagnostic,
        Ok(Err(e)) => {
            tracing::warn!("Lost ffmpeg diagnostics: {}", e);
            String::new()
        }
        Err(_) => {
            tracing::warn!(
                "ffmpeg stderr still open {:?} after exit, dropping diagnostics",
                DIAGNOSTIC_GRACE
            );
            handle.abort();
            String::new()
        }
    }
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill ffmpeg: {}", e);
    }
}
