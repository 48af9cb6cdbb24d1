// src/pool/report.rs
// =============================================================================
// Per-task results collected into a batch report.
//
// Every submitted item shows up exactly once, whatever happened to it.
// The report serializes to JSON for --json, the same way the table output
// reads it.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Lifecycle of a task. There is no retry state: one attempt each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    InFlight,
    Completed,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Queued => "queued",
            TaskState::InFlight => "in flight",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed {
        path: PathBuf,
        bytes: u64,
        /// HTTP status of the response the bytes came from
        status: u16,
    },
    Failed {
        error: String,
    },
    /// Never started because the batch was aborted
    Skipped,
}

impl TaskOutcome {
    /// Final state; a skipped task never left the queue.
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Completed { .. } => TaskState::Completed,
            TaskOutcome::Failed { .. } => TaskState::Failed,
            TaskOutcome::Skipped => TaskState::Queued,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Position in the submitted batch
    pub index: usize,
    pub title: String,
    pub source_url: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

impl TaskReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Sorted by submission index
    pub tasks: Vec<TaskReport>,
    /// Highest number of tasks that were in flight at the same time
    pub peak_in_flight: usize,
}

impl BatchReport {
    pub fn new(mut tasks: Vec<TaskReport>, peak_in_flight: usize) -> Self {
        tasks.sort_by_key(|t| t.index);
        Self {
            tasks,
            peak_in_flight,
        }
    }

    pub fn completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.count(TaskState::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TaskState::Queued)
    }

    /// True when every task completed (vacuously true for an empty batch).
    pub fn is_success(&self) -> bool {
        self.completed() == self.tasks.len()
    }

    fn count(&self, state: TaskState) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.outcome.state() == state)
            .count()
    }
}
