//! In-memory registry of background video tasks.

use crate::models::VideoTask;
use chrono::Utc;
use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<Uuid, VideoTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processing task and drive `job` to completion in the
    /// background. The task records the job's output or error exactly once.
    pub fn spawn<F, E>(&self, prompt: String, request_id: String, job: F) -> VideoTask
    where
        F: Future<Output = Result<String, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let task = VideoTask::new(prompt, request_id);
        let id = task.id;
        self.tasks.insert(id, task.clone());
        tracing::info!(task_id = %id, request_id = %task.request_id, "Video task created");

        let registry = self.clone();
        let handle = tokio::spawn(async move { job.await.map_err(|err| err.to_string()) });
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(video)) => {
                    registry.complete(id, video);
                }
                Ok(Err(message)) => {
                    registry.fail(id, message);
                }
                Err(join_err) => {
                    tracing::error!(task_id = %id, error = %join_err, "Video task aborted");
                    registry.fail(id, "Video generation aborted unexpectedly.".to_string());
                }
            }
        });

        task
    }

    pub fn complete(&self, id: Uuid, video: String) -> bool {
        self.transition(id, |task| task.completed(video))
    }

    pub fn fail(&self, id: Uuid, error: String) -> bool {
        self.transition(id, |task| task.failed(error))
    }

    fn transition(&self, id: Uuid, next: impl FnOnce(&VideoTask) -> Option<VideoTask>) -> bool {
        let Some(mut entry) = self.tasks.get_mut(&id) else {
            tracing::warn!(task_id = %id, "Video task vanished before finishing");
            return false;
        };
        match next(entry.value()) {
            Some(updated) => {
                tracing::info!(task_id = %id, status = ?updated.status, "Video task finished");
                *entry = updated;
                true
            }
            None => false,
        }
    }

    /// Snapshot of a task.
    pub fn get(&self, id: &Uuid) -> Option<VideoTask> {
        self.tasks.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop finished tasks whose completion is older than `ttl`.
    /// Processing tasks are never evicted.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;
        let before = self.tasks.len();
        self.tasks
            .retain(|_, task| task.completed_at.map_or(true, |at| at > cutoff));
        let evicted = before.saturating_sub(self.tasks.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted finished video tasks");
        }
        evicted
    }
}
