//! Incremental parser for ffmpeg `-progress` output.
//!
//! ffmpeg writes `key=value` lines and terminates each reporting interval
//! with a blank line. [`ProgressDemuxer`] turns a live byte stream of that
//! format into [`ProgressEvent`]s as soon as each interval completes, so a
//! caller sees progress while the remux is still running.

use std::collections::HashMap;

use futures::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Elapsed output time, in microseconds despite the name.
pub const ELAPSED_KEY: &str = "out_time_ms";
/// Total duration, in the same units as [`ELAPSED_KEY`].
pub const DURATION_KEY: &str = "duration";

/// Percentage of the remux that has completed.
///
/// Not clamped: ffmpeg can report an elapsed time past the duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub percent: f64,
}

/// Fields seen during one reporting interval. Last write wins per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    fields: HashMap<String, String>,
}

impl ProgressRecord {
    /// Return the record with `key` set to `value`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Close the interval, producing an event if the record carries both an
    /// elapsed time and a non-zero duration.
    ///
    /// Non-numeric values parse as zero. So do `inf`, `nan` and values with
    /// surrounding whitespace.
    pub fn finish(self) -> Option<ProgressEvent> {
        let elapsed = lenient_f64(self.get(ELAPSED_KEY)?);
        let duration = lenient_f64(self.get(DURATION_KEY)?);

        if duration <= 0.0 {
            return None;
        }

        let percent = (elapsed / duration) * 100.0;
        percent.is_finite().then_some(ProgressEvent { percent })
    }
}

fn lenient_f64(value: &str) -> f64 {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Advance the interval state by one line.
///
/// A blank line closes the interval and starts a fresh record. Lines without
/// `=` are ignored.
pub fn step(record: ProgressRecord, line: &str) -> (ProgressRecord, Option<ProgressEvent>) {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return (ProgressRecord::default(), record.finish());
    }

    match line.split_once('=') {
        Some((key, value)) => (record.with_field(key, value), None),
        None => (record, None),
    }
}

/// Parse a complete progress transcript.
///
/// Same state machine as [`ProgressDemuxer`], for input that is already in
/// memory.
pub fn parse_progress(input: &[u8]) -> Vec<ProgressEvent> {
    let mut lines: Vec<&[u8]> = input.split(|b| *b == b'\n').collect();
    // A trailing newline leaves an empty tail that is not a line.
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut record = ProgressRecord::default();
    let mut events = Vec::new();
    for line in lines {
        let (next, event) = step(record, &String::from_utf8_lossy(line));
        record = next;
        events.extend(event);
    }
    events
}

/// Lazily demultiplexes a live progress channel into events.
///
/// Not restartable: once the reader reports end-of-stream or an error, the
/// sequence is over. An interval left open at end-of-stream is dropped.
pub struct ProgressDemuxer<R> {
    reader: R,
    record: ProgressRecord,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> ProgressDemuxer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            record: ProgressRecord::default(),
            buf: Vec::new(),
        }
    }

    /// Read until the next interval that produces an event.
    ///
    /// Returns `Ok(None)` at end-of-stream. Bytes are decoded lossily so a
    /// stray non-UTF-8 byte never aborts the remux.
    pub async fn next_event(&mut self) -> std::io::Result<Option<ProgressEvent>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 {
                return Ok(None);
            }

            let raw = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
            let line = String::from_utf8_lossy(raw);
            let (record, event) = step(std::mem::take(&mut self.record), &line);
            self.record = record;

            if event.is_some() {
                return Ok(event);
            }
        }
    }

    /// Expose the events as a [`Stream`]. The stream ends after the first
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<ProgressEvent>> {
        futures::stream::unfold(Some(self), |state| async move {
            let mut demuxer = state?;
            match demuxer.next_event().await {
                Ok(Some(event)) => Some((Ok(event), Some(demuxer))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FailingReader;
    use super::*;
    use futures::StreamExt;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn percents(input: &[u8]) -> Vec<f64> {
        parse_progress(input).into_iter().map(|e| e.percent).collect()
    }

    #[test]
    fn quarter_progress() {
        assert_eq!(percents(b"out_time_ms=500000\nduration=2000000\n\n"), vec![25.0]);
    }

    #[test]
    fn percent_is_elapsed_over_duration() {
        for (elapsed, duration) in [(1u64, 3u64), (7, 9), (123_456, 987_654), (10, 10)] {
            let input = format!("out_time_ms={elapsed}\nduration={duration}\n\n");
            let got = percents(input.as_bytes());
            let expected = elapsed as f64 / duration as f64 * 100.0;
            assert_eq!(got.len(), 1);
            assert!((got[0] - expected).abs() < 1e-9, "{got:?} vs {expected}");
        }
    }

    #[test]
    fn unrecognized_fields_produce_nothing() {
        assert!(parse_progress(b"foo=bar\n\n").is_empty());
    }

    #[test]
    fn non_numeric_elapsed_is_zero() {
        assert_eq!(percents(b"out_time_ms=abc\nduration=1000\n\n"), vec![0.0]);
    }

    #[test]
    fn non_finite_values_are_zero() {
        let input = b"out_time_ms=inf\nduration=1000\n\nout_time_ms=nan\nduration=1000\n\n";
        assert_eq!(percents(input), vec![0.0, 0.0]);
        assert!(parse_progress(b"out_time_ms=10\nduration=infinity\n\n").is_empty());
    }

    #[test]
    fn overflowing_percent_emits_nothing() {
        assert!(parse_progress(b"out_time_ms=1e308\nduration=0.5\n\n").is_empty());
    }

    #[test]
    fn padded_value_is_non_numeric() {
        assert_eq!(percents(b"out_time_ms= 500\nduration=1000\n\n"), vec![0.0]);
        assert!(parse_progress(b"out_time_ms=500\nduration=1000 \n\n").is_empty());
    }

    #[test]
    fn non_numeric_duration_emits_nothing() {
        assert!(parse_progress(b"out_time_ms=10\nduration=N/A\n\n").is_empty());
    }

    #[test]
    fn zero_duration_emits_nothing() {
        assert!(parse_progress(b"out_time_ms=10\nduration=0\n\n").is_empty());
    }

    #[test]
    fn missing_field_resets_for_next_interval() {
        let input = b"out_time_ms=100\n\nduration=400\n\nout_time_ms=100\nduration=400\n\n";
        assert_eq!(percents(input), vec![25.0]);
    }

    #[test]
    fn last_write_wins_within_interval() {
        let input = b"out_time_ms=100\nduration=1000\nout_time_ms=500\n\n";
        assert_eq!(percents(input), vec![50.0]);
    }

    #[test]
    fn no_boundary_means_no_events() {
        assert!(parse_progress(b"out_time_ms=500\nduration=1000\n").is_empty());
    }

    #[test]
    fn lines_without_equals_are_ignored() {
        let input = b"garbage line\nout_time_ms=1\nduration=4\nprogress\n\n";
        assert_eq!(percents(input), vec![25.0]);
    }

    #[test]
    fn value_may_contain_equals() {
        let record = ProgressRecord::default();
        let (record, _) = step(record, "title=a=b");
        assert_eq!(record.get("title"), Some("a=b"));
    }

    #[test]
    fn crlf_lines_are_accepted() {
        assert_eq!(percents(b"out_time_ms=3\r\nduration=4\r\n\r\n"), vec![75.0]);
    }

    #[test]
    fn percent_is_not_clamped() {
        assert_eq!(percents(b"out_time_ms=3000\nduration=1000\n\n"), vec![300.0]);
    }

    #[test]
    fn empty_value_counts_as_absent() {
        assert!(parse_progress(b"out_time_ms=\nduration=1000\n\n").is_empty());
    }

    #[test]
    fn boundary_always_resets() {
        let (record, _) = step(ProgressRecord::default(), "out_time_ms=1");
        assert!(!record.is_empty());
        let (record, event) = step(record, "");
        assert!(event.is_none());
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn demuxer_matches_sync_parser() {
        let input: &[u8] =
            b"out_time_ms=250\nduration=1000\n\nfoo=bar\n\nout_time_ms=1000\nduration=1000\n\n";
        let mut demuxer = ProgressDemuxer::new(input);

        let mut seen = Vec::new();
        while let Some(event) = demuxer.next_event().await.unwrap() {
            seen.push(event.percent);
        }
        assert_eq!(seen, vec![25.0, 100.0]);
        assert!(demuxer.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn demuxer_emits_before_stream_closes() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut demuxer = ProgressDemuxer::new(BufReader::new(reader));

        writer
            .write_all(b"out_time_ms=1\nduration=2\n\n")
            .await
            .unwrap();

        // The writer is still open; the first event must already be readable.
        let event = demuxer.next_event().await.unwrap();
        assert_eq!(event, Some(ProgressEvent { percent: 50.0 }));

        writer.write_all(b"out_time_ms=2\nduration=2\n\n").await.unwrap();
        drop(writer);

        let event = demuxer.next_event().await.unwrap();
        assert_eq!(event, Some(ProgressEvent { percent: 100.0 }));
        assert!(demuxer.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_yields_all_events() {
        let input: &[u8] = b"out_time_ms=1\nduration=4\n\nout_time_ms=2\nduration=4\n\n";
        let events: Vec<_> = ProgressDemuxer::new(input)
            .into_stream()
            .map(|r| r.unwrap().percent)
            .collect()
            .await;
        assert_eq!(events, vec![25.0, 50.0]);
    }

    #[tokio::test]
    async fn read_error_follows_earlier_events() {
        let reader = FailingReader::new(b"out_time_ms=1\nduration=4\n\nout_time_ms=2\n");
        let mut demuxer = ProgressDemuxer::new(BufReader::new(reader));

        assert_eq!(
            demuxer.next_event().await.unwrap(),
            Some(ProgressEvent { percent: 25.0 })
        );
        let err = demuxer.next_event().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn stream_ends_after_read_error() {
        let reader = FailingReader::new(b"out_time_ms=1\nduration=2\n\n");
        let items: Vec<_> = ProgressDemuxer::new(BufReader::new(reader))
            .into_stream()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().percent, 50.0);
        assert_eq!(
            items[1].as_ref().unwrap_err().kind(),
            std::io::ErrorKind::BrokenPipe
        );
    }

    #[tokio::test]
    async fn non_utf8_bytes_do_not_abort() {
        let input: &[u8] = b"title=\xff\xfe\nout_time_ms=1\nduration=2\n\n";
        let mut demuxer = ProgressDemuxer::new(input);
        assert_eq!(
            demuxer.next_event().await.unwrap(),
            Some(ProgressEvent { percent: 50.0 })
        );
    }
}
