//! Progress reporting.
//!
//! The orchestrator and the data mover report structured events to a
//! [`ProgressSink`] handed to them at construction.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, info};

/// A structured progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Tables enumerated, nothing written yet.
    RunStarted { run_id: String, tables: usize },

    /// Work on a table begins.
    TableStarted {
        table: String,
        position: usize,
        tables: usize,
    },

    /// One chunk of rows was written.
    ChunkWritten {
        table: String,
        chunk: usize,
        rows_written: u64,
        rows_total: i64,
    },

    /// A table finished every stage.
    TableCompleted {
        table: String,
        rows: u64,
        indexes: usize,
        foreign_keys: usize,
        duration_ms: u64,
    },

    /// The run ended.
    RunFinished {
        status: String,
        tables: usize,
        rows: u64,
    },
}

/// Receives progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Forwards events to `tracing`. Chunk events are logged at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, tables } => {
                info!("Run {} started: {} tables", run_id, tables)
            }
            ProgressEvent::TableStarted {
                table,
                position,
                tables,
            } => info!("[{}/{}] {}", position, tables, table),
            ProgressEvent::ChunkWritten {
                table,
                chunk,
                rows_written,
                rows_total,
            } => debug!(
                "{}: chunk {} written ({}/{} rows)",
                table, chunk, rows_written, rows_total
            ),
            ProgressEvent::TableCompleted {
                table,
                rows,
                duration_ms,
                ..
            } => info!("{}: {} rows in {}ms", table, rows, duration_ms),
            ProgressEvent::RunFinished {
                status,
                tables,
                rows,
            } => info!("Run {}: {} tables, {} rows", status, tables, rows),
        }
    }
}

/// Writes one JSON object per event to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesProgress;

impl ProgressSink for JsonLinesProgress {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Recording {
        fn emit(&self, event: &ProgressEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_event_json_shape() {
        let event = ProgressEvent::ChunkWritten {
            table: "users".to_string(),
            chunk: 2,
            rows_written: 200,
            rows_total: 250,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "chunk_written");
        assert_eq!(json["table"], "users");
        assert_eq!(json["rows_written"], 200);
    }

    #[test]
    fn test_sink_as_trait_object() {
        let recording = Recording::default();
        let sink: &dyn ProgressSink = &recording;
        sink.emit(&ProgressEvent::RunStarted {
            run_id: "r".to_string(),
            tables: 3,
        });
        NoopProgress.emit(&ProgressEvent::RunStarted {
            run_id: "r".to_string(),
            tables: 3,
        });
        assert_eq!(recording.0.lock().unwrap().len(), 1);
    }
}
