//! Output sinks
//!
//! The engine hands each accepted record to an [`OutputSink`] and never looks
//! back: there is no return value, and delivery failures stay inside the sink.

use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::types::{UserIdentity, UserTypingData};

/// Destination for finished session records.
///
/// `emit` is called on the input thread, so implementations must not block
/// on slow work; queue it instead.
pub trait OutputSink {
    fn emit(&self, user: &UserIdentity, record: UserTypingData);
}

/// Sink that drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&self, user: &UserIdentity, _record: UserTypingData) {
        debug!(uid = %user.uid, "record dropped by null sink");
    }
}

/// Record paired with the user it belongs to
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmittedRecord {
    pub user: UserIdentity,
    pub record: UserTypingData,
}

/// In-memory buffer; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<EmittedRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything buffered so far
    pub fn drain(&self) -> Vec<EmittedRecord> {
        match self.records.lock() {
            Ok(mut records) => std::mem::take(&mut *records),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, user: &UserIdentity, record: UserTypingData) {
        let entry = EmittedRecord {
            user: user.clone(),
            record,
        };
        match self.records.lock() {
            Ok(mut records) => records.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Hands records to another thread (typically the persistence worker)
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<EmittedRecord>,
}

impl ChannelSink {
    pub fn new(sender: Sender<EmittedRecord>) -> Self {
        Self { sender }
    }
}

impl OutputSink for ChannelSink {
    fn emit(&self, user: &UserIdentity, record: UserTypingData) {
        let entry = EmittedRecord {
            user: user.clone(),
            record,
        };
        if self.sender.send(entry).is_err() {
            error!(uid = %user.uid, "record receiver is gone, dropping record");
        }
    }
}

/// Writes one JSON record per line
pub struct JsonLinesSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn emit(&self, user: &UserIdentity, record: UserTypingData) {
        let entry = EmittedRecord {
            user: user.clone(),
            record,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!(uid = %user.uid, error = %e, "failed to encode record");
                return;
            }
        };
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        let written = writeln!(writer, "{}", line);
        if let Err(e) = written.and_then(|()| writer.flush()) {
            error!(uid = %user.uid, error = %e, "failed to write record");
        }
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Arc<S> {
    fn emit(&self, user: &UserIdentity, record: UserTypingData) {
        (**self).emit(user, record);
    }
}
