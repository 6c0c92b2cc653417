//! Client for Bing Image Creator.
//!
//! A generation is: ensure a session exists, submit the prompt, then poll the
//! async results page until images or a video URL show up.

mod error;
pub mod extract;
pub mod poller;
pub mod request;
pub mod session;

pub use error::BingError;
pub use poller::{PollOutcome, PollPolicy, Sleeper, TokioSleeper};
pub use request::SubmissionRequest;
pub use session::{Session, SessionHandle};

use crate::config::BingConfig;
use crate::models::{Aspect, GenerationKind, ImageGeneration, Model, SelectorInput};
use crate::services::metrics;
use reqwest::header::{LOCATION, REFERER};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A submitted generation: the provider request id plus the prompt it was
/// filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request_id: String,
    pub prompt: String,
}

#[derive(Clone)]
pub struct BingClient {
    config: Arc<BingConfig>,
    session: Arc<RwLock<Session>>,
    /// Serializes bootstraps; `session` is only write-locked to swap one in.
    setup_lock: Arc<Mutex<()>>,
    sleeper: Arc<dyn Sleeper>,
}

impl BingClient {
    pub fn new(config: BingConfig) -> Result<Self, BingError> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: BingConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self, BingError> {
        let config = Arc::new(config);
        let session = Session::new(config.clone())?;
        Ok(Self {
            config,
            session: Arc::new(RwLock::new(session)),
            setup_lock: Arc::new(Mutex::new(())),
            sleeper,
        })
    }

    pub fn has_cookie(&self) -> bool {
        self.config.has_cookie()
    }

    pub async fn is_session_active(&self) -> bool {
        self.session.read().await.is_established()
    }

    pub async fn setup(&self) -> Result<(), BingError> {
        let _guard = self.setup_lock.lock().await;
        self.establish().await.map(|_| ())
    }

    pub async fn invalidate_session(&self) {
        self.session.write().await.invalidate();
    }

    /// Bootstrap against a snapshot of the current session and publish the
    /// result. Callers must hold `setup_lock`.
    async fn establish(&self) -> Result<SessionHandle, BingError> {
        let current = self.session.read().await.clone();
        match current.establish().await {
            Ok(fresh) => {
                let handle = fresh.handle();
                *self.session.write().await = fresh;
                Ok(handle)
            }
            Err(err) => {
                self.session.write().await.invalidate();
                Err(err)
            }
        }
    }

    async fn active_handle(&self) -> Result<Option<SessionHandle>, BingError> {
        let session = self.session.read().await;
        session.check_cookie()?;
        Ok(session.is_established().then(|| session.handle()))
    }

    /// Run `setup` unless a session is already established.
    async fn ensure_session(&self) -> Result<SessionHandle, BingError> {
        if let Some(handle) = self.active_handle().await? {
            return Ok(handle);
        }

        let _guard = self.setup_lock.lock().await;
        if let Some(handle) = self.active_handle().await? {
            return Ok(handle);
        }
        self.establish().await
    }

    /// POST the generation request and return the provider request id.
    ///
    /// The response is read without following redirects: the request id sits
    /// in the `Location` header, or in the body when there is none.
    #[tracing::instrument(skip(self, handle, req), fields(referer = %req.referer))]
    async fn submit(
        &self,
        handle: &SessionHandle,
        req: &SubmissionRequest,
    ) -> Result<String, BingError> {
        let response = handle
            .http_manual
            .post(&self.config.base_url)
            .query(&req.query)
            .header(REFERER, &req.referer)
            .form(&req.form)
            .send()
            .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        extract::ensure_not_rejected(&body)?;

        let target = extract::resolve_redirect(location.as_deref().unwrap_or(&body), &self.config.origin);
        let request_id = extract::request_id(&target)
            .ok_or_else(|| BingError::AuthCookie("Auth failed or generic error.".to_string()))?;

        if location.is_some() {
            let followed = handle.http.get(&target).send().await?.text().await?;
            extract::ensure_not_rejected(&followed)?;
        }

        tracing::info!(request_id = %request_id, "Generation submitted");
        Ok(request_id)
    }

    fn results_url(&self, request_id: &str) -> String {
        format!("{}/async/results/{}", self.config.base_url, request_id)
    }

    async fn fetch_results(
        &self,
        handle: &SessionHandle,
        submission: &Submission,
        kind: GenerationKind,
    ) -> Result<String, BingError> {
        let ig = handle.ig.as_deref().unwrap_or_default();
        let mut query = vec![("q", submission.prompt.as_str()), ("IG", ig)];
        match kind {
            GenerationKind::Image => query.push(("IID", "images.as")),
            GenerationKind::Video => {
                query.extend([("ctype", "video"), ("sm", "1"), ("girftp", "1")])
            }
        }

        metrics::record_poll(kind.as_str());
        Ok(handle
            .http
            .get(self.results_url(&submission.request_id))
            .query(&query)
            .send()
            .await?
            .text()
            .await?)
    }

    fn image_policy(&self, model: Model) -> PollPolicy {
        let interval = if model == Model::Gpt4o {
            self.config.poll_interval_gpt4o
        } else {
            self.config.poll_interval
        };
        PollPolicy {
            interval,
            max_attempts: self.config.max_poll_attempts,
        }
    }

    fn video_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.config.poll_interval,
            max_attempts: self.config.max_poll_attempts,
        }
    }

    async fn poll_images(
        &self,
        handle: &SessionHandle,
        submission: &Submission,
        model: Model,
    ) -> Result<crate::models::ImageResult, BingError> {
        poller::poll_until(
            self.sleeper.as_ref(),
            self.image_policy(model),
            &submission.request_id,
            |_| async move {
                let markup = self
                    .fetch_results(handle, submission, GenerationKind::Image)
                    .await?;
                extract::inspect_image_page(&markup, model, &self.config.image_host)
            },
        )
        .await
    }

    /// Fetch the video results page once and classify it.
    pub async fn check_video_once(
        &self,
        submission: &Submission,
    ) -> Result<PollOutcome<String>, BingError> {
        let handle = self.session.read().await.handle();
        let markup = self
            .fetch_results(&handle, submission, GenerationKind::Video)
            .await?;
        extract::inspect_video_page(&markup)
    }

    /// Poll a submitted video until its URL appears.
    #[tracing::instrument(skip(self, submission), fields(request_id = %submission.request_id))]
    pub async fn poll_video(&self, submission: &Submission) -> Result<String, BingError> {
        poller::poll_until(
            self.sleeper.as_ref(),
            self.video_policy(),
            &submission.request_id,
            |_| self.check_video_once(submission),
        )
        .await
    }

    /// Generate images and wait for them.
    ///
    /// Selectors are validated before any network traffic. The returned
    /// prompt is the provider's enhanced caption when it offers one.
    #[tracing::instrument(skip(self, prompt, model, aspect))]
    pub async fn create_image(
        &self,
        prompt: &str,
        model: Option<&SelectorInput>,
        aspect: Option<&SelectorInput>,
    ) -> Result<ImageGeneration, BingError> {
        let prompt = validate_prompt(prompt)?;
        let model = model.map(Model::from_selector).transpose()?.unwrap_or_default();
        let aspect = aspect.map(Aspect::from_selector).transpose()?.unwrap_or_default();

        self.guard_auth(async {
            let handle = self.ensure_session().await?;
            let req = request::build_request(
                &self.config.base_url,
                prompt,
                model,
                aspect,
                GenerationKind::Image,
                handle.ig.as_deref(),
            );
            let submission = Submission {
                request_id: self.submit(&handle, &req).await?,
                prompt: prompt.to_string(),
            };
            let result = self.poll_images(&handle, &submission, model).await?;

            Ok(ImageGeneration {
                images: result.images,
                prompt: result.enhanced_prompt.unwrap_or_else(|| prompt.to_string()),
                model,
                aspect,
            })
        })
        .await
    }

    /// Submit a video generation and return without waiting for it.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn submit_video(&self, prompt: &str) -> Result<Submission, BingError> {
        let prompt = validate_prompt(prompt)?;

        self.guard_auth(async {
            let handle = self.ensure_session().await?;
            let req = request::build_request(
                &self.config.base_url,
                prompt,
                Model::Dalle,
                Aspect::Square,
                GenerationKind::Video,
                handle.ig.as_deref(),
            );
            Ok(Submission {
                request_id: self.submit(&handle, &req).await?,
                prompt: prompt.to_string(),
            })
        })
        .await
    }

    /// Any auth failure drops the cached session so the next call sets up again.
    async fn guard_auth<T>(
        &self,
        work: impl std::future::Future<Output = Result<T, BingError>>,
    ) -> Result<T, BingError> {
        let result = work.await;
        if let Err(err) = &result {
            if err.is_auth() {
                tracing::warn!(error = %err, "Bing session rejected, invalidating");
                self.invalidate_session().await;
            }
        }
        result
    }
}

fn validate_prompt(prompt: &str) -> Result<&str, BingError> {
    if prompt.trim().is_empty() {
        return Err(BingError::EmptyPrompt);
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::poller::testing::RecordingSleeper;
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SIGNED_IN: &str =
        r#"<div id="id_a" style="display:none"></div><script>IG:"IG42",Salt:"s"</script>"#;
    const READY_PAGE: &str = r#"<style type="text/css"></style>
        <img class="image-row-img mimg" alt="a fox in snow, digital art" src="/th/id/OIG.a?w=270">
        <img src="/th/id/OIG.b?w=270">"#;

    fn client_for(server: &MockServer, cookie: &str) -> (BingClient, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = BingConfig {
            cookie_u: SecretString::new(cookie.to_string()),
            base_url: format!("{}/images/create", server.uri()),
            origin: server.uri(),
            image_host: "https://th.bing.com".to_string(),
            cookie_domain: None,
            max_poll_attempts: Some(5),
            ..BingConfig::default()
        };
        let client = BingClient::with_sleeper(config, sleeper.clone()).unwrap();
        (client, sleeper)
    }

    async fn mount_session(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/images/create"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGNED_IN))
            .mount(server)
            .await;
    }

    async fn mount_submission(server: &MockServer, request_id: &str) {
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("/images/create?q=x&id={}", request_id).as_str()),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn create_image_polls_until_tiles_render() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        mount_submission(&server, "req-1").await;

        Mock::given(method("GET"))
            .and(path("/images/create/async/results/req-1"))
            .and(query_param("IID", "images.as"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div>working</div>"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/create/async/results/req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(READY_PAGE))
            .mount(&server)
            .await;

        let (client, sleeper) = client_for(&server, "cookie");
        let model = SelectorInput::Name("GPT4O".to_string());
        let generation = client
            .create_image("a fox", Some(&model), None)
            .await
            .unwrap();

        assert_eq!(
            generation.images,
            vec![
                "https://th.bing.com/th/id/OIG.a?pid=ImgGn".to_string(),
                "https://th.bing.com/th/id/OIG.b?pid=ImgGn".to_string(),
            ]
        );
        assert_eq!(generation.prompt, "a fox in snow, digital art");
        assert_eq!(generation.model, Model::Gpt4o);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(3); 2]);
    }

    #[tokio::test]
    async fn submission_sends_form_payload() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .and(query_param("rt", "4"))
            .and(query_param("mdl", "4"))
            .and(query_param("IG", "IG42"))
            .and(body_string_contains("model=maiimage1"))
            .and(body_string_contains("aspectRatio=4%3A7"))
            .respond_with(ResponseTemplate::new(200).set_body_string("/images/create?id=req-2"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/create/async/results/req-2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(READY_PAGE))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let generation = client
            .create_image(
                "a fox",
                Some(&SelectorInput::Code(4)),
                Some(&SelectorInput::Name("portrait".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(generation.aspect, Aspect::Portrait);
    }

    #[tokio::test]
    async fn rejection_on_submit_is_reported() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<div data-clarity-tag="BlockedByContentPolicy"></div>"#),
            )
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let err = client.create_image("bad", None, None).await.unwrap_err();

        assert!(matches!(err, BingError::PromptRejected));
        assert!(client.is_session_active().await);
    }

    #[tokio::test]
    async fn rejection_on_redirect_target_is_reported() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/images/create/landing?id=r9"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/create/landing"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<div class="girer_center block_icon"></div>"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let err = client.create_image("bad", None, None).await.unwrap_err();

        assert!(matches!(err, BingError::PromptRejected));
        let polled = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .any(|r| r.url.path().contains("/async/results/"));
        assert!(!polled);
    }

    #[tokio::test]
    async fn session_status_is_readable_while_setup_is_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/create"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SIGNED_IN)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let setup = tokio::spawn({
            let client = client.clone();
            async move { client.setup().await }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let active = tokio::time::timeout(Duration::from_millis(500), client.is_session_active())
            .await
            .expect("session status blocked behind setup");
        assert!(!active);

        setup.await.unwrap().unwrap();
        assert!(client.is_session_active().await);
    }

    #[tokio::test]
    async fn concurrent_generations_share_one_setup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/create"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SIGNED_IN)
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_submission(&server, "vid-c").await;
        Mock::given(method("GET"))
            .and(path("/images/create"))
            .and(query_param("id", "vid-c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .with_priority(1)
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let (a, b) = tokio::join!(client.submit_video("waves"), client.submit_video("tides"));

        assert_eq!(a.unwrap().request_id, "vid-c");
        assert_eq!(b.unwrap().request_id, "vid-c");
    }

    #[tokio::test]
    async fn missing_request_id_invalidates_session() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, "cookie");
        let err = client.create_image("a fox", None, None).await.unwrap_err();

        assert_eq!(err.to_string(), "Auth failed or generic error.");
        assert!(!client.is_session_active().await);
    }

    #[tokio::test]
    async fn invalid_selector_fails_before_network() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server, "cookie");

        let err = client
            .create_image("a fox", None, Some(&SelectorInput::Name("DIAGONAL".to_string())))
            .await
            .unwrap_err();

        assert!(matches!(err, BingError::InvalidAspect(ref v) if v == "DIAGONAL"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_cookie_fails_before_network() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server, "");

        let err = client.submit_video("waves").await.unwrap_err();

        assert!(err.is_auth());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn video_is_polled_with_video_flags() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .and(query_param("ctype", "video"))
            .and(body_string_contains("model=dalle"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/images/create?id=vid-1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/create/async/results/vid-1"))
            .and(query_param("ctype", "video"))
            .and(query_param("girftp", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"errorMessage":"Pending"}"#),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/create/async/results/vid-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"showContent":"https://cdn.example/v.mp4"}"#),
            )
            .mount(&server)
            .await;

        let (client, sleeper) = client_for(&server, "cookie");
        let submission = client.submit_video("waves").await.unwrap();
        assert_eq!(submission.request_id, "vid-1");

        let video = client.poll_video(&submission).await.unwrap();
        assert_eq!(video, "https://cdn.example/v.mp4");
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(5)]);
    }
}
