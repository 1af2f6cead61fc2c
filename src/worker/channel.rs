//! Worker output channel and progress reporting

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::executor::ProgressCell;
use crate::protocol::WorkerMessage;

/// Line-oriented sink for protocol messages (stdout in a real worker)
pub struct WorkerChannel {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl WorkerChannel {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Write one message as a line and flush it
    pub fn send(&self, message: &WorkerMessage) -> Result<()> {
        let line = message.to_line()?;
        let mut sink = self.sink.lock();
        writeln!(sink, "{}", line)?;
        sink.flush()?;
        Ok(())
    }
}

/// Handle through which a computation reports its progress
///
/// Every write lands in a local [`ProgressCell`] and, when attached to a
/// channel, is forwarded to the controller.
pub struct ProgressReporter {
    cell: ProgressCell,
    channel: Option<Arc<WorkerChannel>>,
}

impl ProgressReporter {
    pub fn new(channel: Arc<WorkerChannel>) -> Self {
        Self {
            cell: ProgressCell::new(),
            channel: Some(channel),
        }
    }

    /// Reporter that only keeps the value locally
    pub fn detached() -> Self {
        Self {
            cell: ProgressCell::new(),
            channel: None,
        }
    }

    /// Current reading
    pub fn get(&self) -> f64 {
        self.cell.get()
    }

    /// Record a new reading in `[0, 1]`
    pub fn set(&self, value: f64) {
        self.cell.set(value);
        if let Some(channel) = &self.channel {
            let value = self.cell.get();
            // The controller may already be gone; progress is advisory.
            if let Err(e) = channel.send(&WorkerMessage::Progress { value }) {
                debug!(error = %e, value, "Dropped progress update");
            }
        }
    }
}

/// In-memory sink shared between a channel and a test
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn messages(&self) -> Vec<WorkerMessage> {
        let bytes = self.0.lock().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| WorkerMessage::from_line(line).unwrap())
            .collect()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
