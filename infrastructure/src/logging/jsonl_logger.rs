//! JSONL file writer for run events.
//!
//! A stream gateway adapter that appends every published event as one JSON
//! line stamped with the run id, channel, and timestamp. Wire it behind a
//! fanout gateway to get a durable trace of a run alongside live streaming.

use arena_application::ports::stream_gateway::{RunEvent, StreamChannel, StreamGateway};
use arena_domain::RunId;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL run logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlRunLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlRunLogger {
    /// Create a new logger writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create run log directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create run log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StreamGateway for JsonlRunLogger {
    fn publish(&self, run_id: &RunId, channel: StreamChannel, event: RunEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // The event already serializes with a `type` tag; stamp in the
        // run id, channel, and timestamp alongside it
        let Ok(serde_json::Value::Object(mut map)) = serde_json::to_value(&event) else {
            return;
        };
        map.insert(
            "run_id".to_string(),
            serde_json::Value::String(run_id.to_string()),
        );
        map.insert(
            "channel".to_string(),
            serde_json::Value::String(
                match channel {
                    StreamChannel::Primary => "primary",
                    StreamChannel::Debug => "debug",
                }
                .to_string(),
            ),
        );
        map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));

        let Ok(line) = serde_json::to_string(&serde_json::Value::Object(map)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // Flush per event for crash safety — JSONL is append-only
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlRunLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
