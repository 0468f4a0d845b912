//! In-memory log capture for the dashboard's log panel.
//!
//! While the terminal is in raw/alternate-screen mode nothing may be written
//! to stdout or stderr, so the dashboard installs [`LogBuffer::layer`] in
//! place of the usual fmt layer. The buffer is created at startup, handed to
//! the UI, and detached at shutdown; after [`LogBuffer::detach`] new events
//! are discarded.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

struct Inner {
    lines: VecDeque<String>,
    capacity: usize,
    attached: bool,
}

/// Bounded ring of formatted log lines. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Inner>>,
}

impl LogBuffer {
    pub const DEFAULT_CAPACITY: usize = 200;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                lines: VecDeque::with_capacity(capacity),
                capacity,
                attached: true,
            })),
        }
    }

    /// A `tracing-subscriber` layer that appends to this buffer.
    pub fn layer(&self) -> LogBufferLayer {
        LogBufferLayer {
            buffer: self.clone(),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut inner = self.lock();
        if !inner.attached {
            return;
        }
        if inner.lines.len() == inner.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back(line.into());
    }

    /// Copy of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.iter().cloned().collect()
    }

    /// The newest `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let inner = self.lock();
        let skip = inner.lines.len().saturating_sub(n);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Stop accepting new lines. Already buffered lines are kept.
    pub fn detach(&self) {
        self.lock().attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the ring inconsistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("LogBuffer")
            .field("len", &inner.lines.len())
            .field("capacity", &inner.capacity)
            .field("attached", &inner.attached)
            .finish()
    }
}

/// Layer returned by [`LogBuffer::layer`].
pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        self.buffer.push(format!(
            "{} {:<5} {}: {}{}",
            Local::now().format("%H:%M:%S"),
            meta.level(),
            meta.target(),
            visitor.message,
            visitor.fields,
        ));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
