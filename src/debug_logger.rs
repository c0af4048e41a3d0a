// Asynchronous JSONL log of move decisions
//
// Writes are fire-and-forget tokio tasks so the /move response never waits on
// disk. Each line is a `DebugLogEntry` that the replay engine can load back.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::{Board, Direction};

/// One logged decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub turn: i32,
    pub chosen_move: String,
    /// Id of the snake that made the move
    pub you_id: String,
    pub board: Board,
    pub timestamp: String,
}

impl DebugLogEntry {
    pub fn new(turn: i32, you_id: String, board: Board, chosen_move: Direction) -> Self {
        DebugLogEntry {
            turn,
            chosen_move: chosen_move.as_str().to_string(),
            you_id,
            board,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The entry as a single JSONL line, newline included
    pub fn to_line(&self) -> Result<String, String> {
        serde_json::to_string(self)
            .map(|json| format!("{}\n", json))
            .map_err(|e| format!("Failed to serialize debug log entry: {}", e))
    }
}

/// Shared handle to the debug log file. Cloning shares the file.
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Opens (and truncates) the log file when `enabled`.
    /// A file that cannot be created leaves the logger disabled.
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return DebugLogger::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                DebugLogger::disabled()
            }
        }
    }

    /// A logger that drops everything
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues one decision for writing and returns immediately.
    /// Must be called from within a tokio runtime.
    pub fn log_move(&self, turn: i32, you_id: String, board: Board, chosen_move: Direction) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        let entry = DebugLogEntry::new(turn, you_id, board, chosen_move);

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: DebugLogEntry) {
        let mut file_guard = file_handle.lock().await;
        let Some(file) = file_guard.as_mut() else {
            return;
        };

        let line = match entry.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };

        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!("Failed to write debug log entry: {}", e);
        } else if let Err(e) = file.flush().await {
            error!("Failed to flush debug log: {}", e);
        }
    }
}
