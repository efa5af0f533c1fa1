//! JSON-lines capture stream.
//!
//! [`StreamSink`] writes every sink operation as one JSON object per line,
//! so a call can be captured in one process and compared in another.
//! [`replay`] feeds such a stream back through a fresh [`CallCapture`],
//! which re-checks the call protocol.
//!
//! ```text
//! {"op":"field","buffer":"caller-inputs","bytes":"eb"}
//! {"op":"value","buffer":"caller-inputs"}
//! {"op":"call","inputs":"caller-inputs","outputs":"caller-outputs"}
//! ```

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::buffer::BufferId;
use crate::call::CallCapture;
use crate::error::CaptureError;
use crate::sink::CaptureSink;

/// One sink operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StreamEvent {
    Field {
        buffer: BufferId,
        #[serde(with = "crate::hex")]
        bytes: Vec<u8>,
    },
    Value {
        buffer: BufferId,
    },
    Call {
        inputs: BufferId,
        outputs: BufferId,
    },
}

impl StreamEvent {
    /// Apply this event to `sink`.
    pub fn apply(&self, sink: &mut dyn CaptureSink) -> Result<(), CaptureError> {
        match self {
            Self::Field { buffer, bytes } => sink.append(*buffer, bytes),
            Self::Value { buffer } => sink.close_value(*buffer),
            Self::Call { inputs, outputs } => sink.close_call(*inputs, *outputs),
        }
    }
}

/// Sink that serializes operations without validating them.
pub struct StreamSink<W: Write> {
    writer: W,
    events: usize,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, events: 0 }
    }

    /// Number of events written so far.
    #[must_use]
    pub const fn events(&self) -> usize {
        self.events
    }

    /// Flush and hand back the writer.
    pub fn into_inner(mut self) -> Result<W, CaptureError> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn emit(&mut self, event: &StreamEvent) -> Result<(), CaptureError> {
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        self.events += 1;
        Ok(())
    }
}

impl<W: Write> CaptureSink for StreamSink<W> {
    fn append(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), CaptureError> {
        self.emit(&StreamEvent::Field {
            buffer,
            bytes: bytes.to_vec(),
        })
    }

    fn close_value(&mut self, buffer: BufferId) -> Result<(), CaptureError> {
        self.emit(&StreamEvent::Value { buffer })
    }

    fn close_call(&mut self, inputs: BufferId, outputs: BufferId) -> Result<(), CaptureError> {
        self.emit(&StreamEvent::Call { inputs, outputs })
    }
}

/// Rebuild a call from a stream. Blank lines are skipped.
pub fn replay<R: BufRead>(reader: R) -> Result<CallCapture, CaptureError> {
    let mut capture = CallCapture::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: StreamEvent = serde_json::from_str(&line).map_err(|source| {
            CaptureError::Stream {
                line: idx + 1,
                source,
            }
        })?;
        event.apply(&mut capture)?;
    }
    Ok(capture)
}
