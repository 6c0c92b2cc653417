//! Video task lifecycle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

/// A fire-and-forget video generation.
///
/// Records are immutable snapshots: each transition builds a new value that
/// replaces the old one in the registry, so readers never see a half-written
/// task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTask {
    pub id: Uuid,
    pub prompt: String,
    pub request_id: String,
    pub status: TaskStatus,
    pub video: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl VideoTask {
    pub fn new(prompt: String, request_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt,
            request_id,
            status: TaskStatus::Processing,
            video: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Returns the completed successor, or `None` if already terminal.
    pub fn completed(&self, video: String) -> Option<Self> {
        if self.status.is_terminal() {
            return None;
        }
        Some(Self {
            status: TaskStatus::Completed,
            video: Some(video),
            completed_at: Some(Utc::now()),
            ..self.clone()
        })
    }

    /// Returns the failed successor, or `None` if already terminal.
    pub fn failed(&self, error: String) -> Option<Self> {
        if self.status.is_terminal() {
            return None;
        }
        Some(Self {
            status: TaskStatus::Failed,
            error: Some(error),
            completed_at: Some(Utc::now()),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_processing() {
        let task = VideoTask::new("a cat".to_string(), "req-1".to_string());
        assert_eq!(task.status, TaskStatus::Processing);
        assert!(task.video.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn terminal_tasks_do_not_transition_again() {
        let task = VideoTask::new("a cat".to_string(), "req-1".to_string());
        let done = task.completed("https://v/1.mp4".to_string()).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.failed("late".to_string()).is_none());
        assert!(done.completed("other".to_string()).is_none());
    }
}
