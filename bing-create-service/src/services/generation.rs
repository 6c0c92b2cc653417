use crate::models::{
    Aspect, GenerationKind, ImageGeneration, Model, SelectorInput, VideoTask,
};
use crate::services::bing::{BingClient, BingError};
use crate::services::metrics;
use crate::services::tasks::TaskRegistry;
use uuid::Uuid;

/// A video submission accepted by the provider and now polled in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTaskCreated {
    pub task_id: Uuid,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub enum Generation {
    Image(ImageGeneration),
    Video(VideoTaskCreated),
}

/// Ties the provider client to the video task registry and counts outcomes.
#[derive(Clone)]
pub struct GenerationService {
    bing: BingClient,
    tasks: TaskRegistry,
}

impl GenerationService {
    pub fn new(bing: BingClient, tasks: TaskRegistry) -> Self {
        Self { bing, tasks }
    }

    pub fn bing(&self) -> &BingClient {
        &self.bing
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub async fn create_image(
        &self,
        prompt: &str,
        model: Option<&SelectorInput>,
        aspect: Option<&SelectorInput>,
    ) -> Result<ImageGeneration, BingError> {
        let result = self.bing.create_image(prompt, model, aspect).await;
        metrics::record_generation("image", metrics::outcome_label(result.as_ref().err()));
        result
    }

    /// Submit a video and hand the polling to a background task.
    pub async fn create_video(&self, prompt: &str) -> Result<VideoTaskCreated, BingError> {
        let submission = self.bing.submit_video(prompt).await.inspect_err(|err| {
            metrics::record_generation("video", metrics::outcome_label(Some(err)));
        })?;

        let bing = self.bing.clone();
        let polled = submission.clone();
        let task = self.tasks.spawn(
            submission.prompt.clone(),
            submission.request_id.clone(),
            async move {
                let result = bing.poll_video(&polled).await;
                metrics::record_generation("video", metrics::outcome_label(result.as_ref().err()));
                result
            },
        );

        Ok(VideoTaskCreated {
            task_id: task.id,
            prompt: submission.prompt,
        })
    }

    /// Image or video by `kind`. Selectors are validated for both kinds even
    /// though video ignores them.
    pub async fn create(
        &self,
        prompt: &str,
        model: Option<&SelectorInput>,
        aspect: Option<&SelectorInput>,
        kind: GenerationKind,
    ) -> Result<Generation, BingError> {
        match kind {
            GenerationKind::Image => self
                .create_image(prompt, model, aspect)
                .await
                .map(Generation::Image),
            GenerationKind::Video => {
                model.map(Model::from_selector).transpose()?;
                aspect.map(Aspect::from_selector).transpose()?;
                self.create_video(prompt).await.map(Generation::Video)
            }
        }
    }

    pub fn get_video_task(&self, id: &Uuid) -> Option<VideoTask> {
        self.tasks.get(id)
    }
}
