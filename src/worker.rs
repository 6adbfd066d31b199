/// store worker support structs
///
use serde::{Deserialize, Serialize};

pub type JsonString = String;

pub const OK: &str = "ok";
pub const DOWN: &str = "down";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    #[default]
    Idle,
    Busy,
    Broken,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub status: String,
    pub state: WorkerState,
    pub uptime: String,
    pub error_count: u16,
    pub entries: usize,
}

impl WorkerStatus {
    pub fn new(
        worker_id: String,
        status: String,
        state: WorkerState,
        uptime: String,
        error_count: u16,
        entries: usize,
    ) -> WorkerStatus {
        WorkerStatus {
            worker_id,
            status,
            state,
            uptime,
            error_count,
            entries,
        }
    }

    /// the status a supervisor reports for a worker that no longer answers
    pub fn down(worker_id: String) -> WorkerStatus {
        WorkerStatus::new(
            worker_id,
            DOWN.to_string(),
            WorkerState::Broken,
            String::new(),
            0,
            0,
        )
    }
}
