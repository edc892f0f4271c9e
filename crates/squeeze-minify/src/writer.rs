//! Buffering writer that compresses each completed unit of output
//!
//! Text is accumulated until a completion marker shows up (or the caller
//! flushes explicitly). The completed unit is then run through the
//! [`CompressorPipeline`] once and written to the downstream sink.

use crate::marker::MarkerDetector;
use crate::pipeline::CompressorPipeline;
use crate::utf8::Utf8Decoder;
use parking_lot::Mutex;
use squeeze_core::{Error, Result};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// Counters for the units a writer has emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Units compressed and written to the sink
    pub units: u64,
    /// Bytes handed to the pipeline
    pub bytes_in: u64,
    /// Bytes written to the sink
    pub bytes_out: u64,
}

impl FlushStats {
    fn record(&mut self, bytes_in: usize, bytes_out: usize) {
        self.units += 1;
        self.bytes_in += bytes_in as u64;
        self.bytes_out += bytes_out as u64;
    }

    /// Bytes removed by compression so far
    pub fn saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }
}

#[derive(Debug)]
struct WriterState<W> {
    buffer: String,
    decoder: Utf8Decoder,
    /// `None` once the writer has been closed
    sink: Option<W>,
    stats: FlushStats,
}

impl<W: Write> WriterState<W> {
    fn sink(&mut self) -> Result<&mut W> {
        self.sink.as_mut().ok_or_else(closed)
    }

    /// Compress the whole buffer, write it out and clear the buffer
    ///
    /// The unit leaves the buffer before the sink is touched, so a failing
    /// sink never causes it to be written twice.
    fn emit(&mut self, pipeline: &CompressorPipeline) -> Result<()> {
        let unit = std::mem::take(&mut self.buffer);
        let compressed = pipeline.transform(&unit);

        let sink = self.sink()?;
        let written = sink
            .write_all(compressed.as_bytes())
            .and_then(|()| sink.flush());
        if let Err(e) = written {
            warn!(error = %e, bytes = compressed.len(), "Failed to write compressed unit");
            return Err(Error::Io(e));
        }

        self.stats.record(unit.len(), compressed.len());
        debug!(
            bytes_in = unit.len(),
            bytes_out = compressed.len(),
            "Flushed unit"
        );
        Ok(())
    }

    /// Emit the buffer if text appended after `old_len` completed a marker
    fn emit_completed(
        &mut self,
        pipeline: &CompressorPipeline,
        detector: &MarkerDetector,
        old_len: usize,
    ) -> Result<()> {
        let from = detector.rescan_from(&self.buffer, old_len);
        if detector.matches(&self.buffer[from..]) {
            self.emit(pipeline)
        } else {
            Ok(())
        }
    }

    /// Emit whatever is buffered, then flush the sink
    fn flush(&mut self, pipeline: &CompressorPipeline) -> Result<()> {
        if self.buffer.is_empty() {
            self.sink()?.flush()?;
            return Ok(());
        }
        self.emit(pipeline)
    }
}

fn closed() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "writer is closed"))
}

/// Writer that buffers output and compresses it one logical unit at a time
///
/// A unit is complete as soon as one of the detector's markers has been
/// written, even if the marker was split across several writes. Completing
/// a unit flushes everything buffered at that point, including text that
/// followed the marker in the same write. Every
/// operation runs under a single lock, so a write that completes a unit and
/// a concurrent [`flush`](Self::flush) never observe a half-emptied buffer.
///
/// Whatever is still buffered when the writer is closed or dropped is
/// emitted as a final unit.
pub struct BufferedFlushWriter<W: Write> {
    pipeline: Arc<CompressorPipeline>,
    detector: MarkerDetector,
    inner: Mutex<WriterState<W>>,
}

impl<W: Write> BufferedFlushWriter<W> {
    /// Create a writer with the default pipeline and completion markers
    pub fn new(sink: W) -> Self {
        Self {
            pipeline: Arc::new(CompressorPipeline::default()),
            detector: MarkerDetector::default(),
            inner: Mutex::new(WriterState {
                buffer: String::new(),
                decoder: Utf8Decoder::default(),
                sink: Some(sink),
                stats: FlushStats::default(),
            }),
        }
    }

    /// Use a shared pipeline
    pub fn with_pipeline(mut self, pipeline: Arc<CompressorPipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Use a custom marker set
    pub fn with_detector(mut self, detector: MarkerDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Pipeline applied to each unit
    pub fn pipeline(&self) -> &CompressorPipeline {
        &self.pipeline
    }

    /// Markers that complete a unit
    pub fn detector(&self) -> &MarkerDetector {
        &self.detector
    }

    /// Append text, emitting a unit if it completes one
    pub fn write_text(&self, text: &str) -> Result<()> {
        let mut state = self.inner.lock();
        state.sink()?;
        let old_len = state.buffer.len();
        state.buffer.push_str(text);
        state.emit_completed(&self.pipeline, &self.detector, old_len)
    }

    /// Append UTF-8 encoded bytes, emitting a unit if they complete one
    ///
    /// A character split across calls is held back until it is complete.
    /// Invalid UTF-8 is an [`Error::Encoding`]; the valid text before it is
    /// kept.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.sink()?;
        let old_len = state.buffer.len();
        let decoded = state.decoder.decode(bytes, &mut state.buffer);
        state.emit_completed(&self.pipeline, &self.detector, old_len)?;
        decoded
    }

    /// Emit the buffered text as a unit, then flush the sink
    ///
    /// The sink is flushed even when nothing was buffered.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush(&self.pipeline)
    }

    /// Emit the remaining text and hand back the sink
    ///
    /// The writer is unusable afterwards. Fails if the output ended in the
    /// middle of a multi-byte character, after everything else was emitted.
    pub fn close(&self) -> Result<W> {
        let mut state = self.inner.lock();
        state.sink()?;
        let flushed = state.flush(&self.pipeline);
        let finished = state.decoder.finish();
        let sink = state.sink.take().ok_or_else(closed)?;
        debug!(
            units = state.stats.units,
            saved = state.stats.saved(),
            "Writer closed"
        );
        flushed?;
        finished?;
        Ok(sink)
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.inner.lock().sink.is_none()
    }

    /// Bytes buffered but not yet emitted
    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// Counters for the units emitted so far
    pub fn stats(&self) -> FlushStats {
        self.inner.lock().stats
    }
}

impl<W: Write> fmt::Debug for BufferedFlushWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("BufferedFlushWriter")
            .field("pipeline", &self.pipeline)
            .field("detector", &self.detector)
            .field("buffered", &state.buffer.len())
            .field("closed", &state.sink.is_none())
            .field("stats", &state.stats)
            .finish()
    }
}

impl<W: Write> Drop for BufferedFlushWriter<W> {
    fn drop(&mut self) {
        let state = self.inner.get_mut();
        if state.sink.is_none() {
            return;
        }
        if let Err(e) = state.flush(&self.pipeline) {
            warn!(error = %e, "Failed to flush writer on drop");
        }
        if state.decoder.pending() > 0 {
            warn!(
                bytes = state.decoder.pending(),
                "Writer dropped inside a multi-byte character"
            );
        }
    }
}

impl<W: Write> Write for &BufferedFlushWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedFlushWriter::write_bytes(*self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedFlushWriter::flush(*self)?;
        Ok(())
    }
}

impl<W: Write> Write for BufferedFlushWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedFlushWriter::write_bytes(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedFlushWriter::flush(self)?;
        Ok(())
    }
}

impl<W: Write> fmt::Write for BufferedFlushWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_text(s).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeeze_core::CompressionOptions;

    #[derive(Debug, Default)]
    struct Recorded {
        writes: Vec<String>,
        flushes: usize,
    }

    /// Sink that records every write and flush
    #[derive(Debug, Clone, Default)]
    struct Recorder(Arc<Mutex<Recorded>>);

    impl Recorder {
        fn writes(&self) -> Vec<String> {
            self.0.lock().writes.clone()
        }

        fn flushes(&self) -> usize {
            self.0.lock().flushes
        }
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .writes
                .push(String::from_utf8_lossy(buf).into_owned());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.lock().flushes += 1;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn passthrough() -> Arc<CompressorPipeline> {
        Arc::new(CompressorPipeline::new(CompressionOptions::disabled()))
    }

    #[test]
    fn test_marker_split_across_writes() {
        let split = Recorder::default();
        let writer = BufferedFlushWriter::new(split.clone());
        writer.write_text("<html>\n  <body></body>\n</ht").unwrap();
        assert!(split.writes().is_empty());
        writer.write_text("ml>").unwrap();
        assert_eq!(split.writes(), vec!["<html><body></body></html>"]);

        let whole = Recorder::default();
        let writer = BufferedFlushWriter::new(whole.clone());
        writer.write_text("<html>\n  <body></body>\n</html>").unwrap();
        assert_eq!(whole.writes(), split.writes());
    }

    #[test]
    fn test_units_are_compressed_independently() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone());
        writer.write_text("<html> <p>a</p> </html>").unwrap();
        writer.write_text("<html> <p>b</p> </html>").unwrap();
        assert_eq!(
            sink.writes(),
            vec!["<html><p>a</p></html>", "<html><p>b</p></html>"]
        );
        assert_eq!(writer.stats().units, 2);
    }

    #[test]
    fn test_several_markers_make_one_unit() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone()).with_pipeline(passthrough());
        writer.write_text("<html></html>\n<html></html>").unwrap();
        assert_eq!(sink.writes(), vec!["<html></html>\n<html></html>"]);
    }

    #[test]
    fn test_marker_flush_takes_whole_buffer() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone());
        writer.write_text("<html></html>\n<!-- trailer -->").unwrap();
        assert_eq!(writer.buffered_len(), 0);
        assert_eq!(sink.writes(), vec!["<html></html><!-- trailer -->"]);

        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone()).with_pipeline(passthrough());
        writer.write_text("<partial-response>").unwrap();
        writer.write_text("</partial-response><html>").unwrap();
        assert_eq!(
            sink.writes(),
            vec!["<partial-response></partial-response><html>"]
        );
        assert_eq!(writer.buffered_len(), 0);
        assert_eq!(writer.stats().units, 1);
    }

    #[test]
    fn test_marker_at_start_of_buffer() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone()).with_pipeline(passthrough());
        writer.write_text("<body></body>").unwrap();
        writer.flush().unwrap();
        writer.write_text("</html>").unwrap();
        assert_eq!(sink.writes(), vec!["<body></body>", "</html>"]);
    }

    #[test]
    fn test_flush_on_empty_buffer_still_flushes_sink() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone());
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert!(sink.writes().is_empty());
        assert_eq!(sink.flushes(), 2);
        assert_eq!(writer.stats(), FlushStats::default());
    }

    #[test]
    fn test_explicit_flush_emits_partial_unit() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone());
        writer.write_text("<div>\n  <span>x</span>\n</div>").unwrap();
        assert!(sink.writes().is_empty());
        writer.flush().unwrap();
        assert_eq!(sink.writes(), vec!["<div><span>x</span></div>"]);
        assert_eq!(writer.buffered_len(), 0);
    }

    #[test]
    fn test_sink_failure_propagates_and_drops_unit() {
        let writer = BufferedFlushWriter::new(Broken);
        let err = writer.write_text("<html></html>").unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
        assert_eq!(writer.buffered_len(), 0);
        assert_eq!(writer.stats().units, 0);

        let err = (&writer).write_all(b"<p></p></html>").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_close_emits_everything() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone());
        writer.write_text("<p>  x  </p>").unwrap();
        assert!(sink.writes().is_empty());

        let returned = writer.close().unwrap();
        assert_eq!(returned.writes(), vec!["<p>  x  </p>"]);
        assert!(writer.is_closed());
    }

    #[test]
    fn test_use_after_close_fails() {
        let writer = BufferedFlushWriter::new(Vec::new());
        writer.write_text("<p>a</p>").unwrap();
        assert_eq!(writer.close().unwrap(), b"<p>a</p>");

        assert!(writer.write_text("more").is_err());
        assert!(writer.write_bytes(b"more").is_err());
        assert!(writer.flush().is_err());
        assert!(writer.close().is_err());
    }

    #[test]
    fn test_bytes_split_inside_character() {
        let sink = Recorder::default();
        let writer = BufferedFlushWriter::new(sink.clone()).with_pipeline(passthrough());
        let bytes = "<html>é</html>".as_bytes();
        (&writer).write_all(&bytes[..7]).unwrap();
        assert_eq!(writer.buffered_len(), "<html>".len());
        (&writer).write_all(&bytes[7..]).unwrap();
        assert_eq!(sink.writes(), vec!["<html>é</html>"]);
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let writer = BufferedFlushWriter::new(Vec::new()).with_pipeline(passthrough());
        let err = (&writer).write(b"<p>\xff</p>").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(writer.close().unwrap(), b"<p>");
    }

    #[test]
    fn test_truncated_character_fails_close() {
        let writer = BufferedFlushWriter::new(Vec::new()).with_pipeline(passthrough());
        writer.write_bytes(&"aé".as_bytes()[..2]).unwrap();
        assert!(matches!(writer.close(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_drop_flushes_remaining_text() {
        let sink = Recorder::default();
        {
            let writer = BufferedFlushWriter::new(sink.clone());
            writer.write_text("<p>bye</p>").unwrap();
        }
        assert_eq!(sink.writes(), vec!["<p>bye</p>"]);
    }

    #[test]
    fn test_custom_markers() {
        let sink = Recorder::default();
        let detector = MarkerDetector::new(["</svg>"]).unwrap();
        let writer = BufferedFlushWriter::new(sink.clone())
            .with_pipeline(passthrough())
            .with_detector(detector);
        writer.write_text("<html></html>").unwrap();
        assert!(sink.writes().is_empty());
        writer.write_text("<svg></svg>").unwrap();
        assert_eq!(sink.writes(), vec!["<html></html><svg></svg>"]);
    }

    #[test]
    fn test_stats() {
        let writer = BufferedFlushWriter::new(Vec::new());
        writer.write_text("<html>\n  <p>a</p>\n</html>").unwrap();
        let stats = writer.stats();
        assert_eq!(stats.units, 1);
        assert_eq!(stats.bytes_in, 25);
        assert_eq!(stats.bytes_out, 21);
        assert_eq!(stats.saved(), 4);
    }

    #[test]
    fn test_fmt_write() {
        let sink = Recorder::default();
        let mut writer = BufferedFlushWriter::new(sink.clone()).with_pipeline(passthrough());
        fmt::Write::write_fmt(&mut writer, format_args!("<html>{}</html>", 42)).unwrap();
        assert_eq!(sink.writes(), vec!["<html>42</html>"]);
    }
}
