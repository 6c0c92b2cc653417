#![allow(dead_code)]

use async_trait::async_trait;
use bing_create_service::config::{BingConfig, BingCreateConfig, TaskConfig};
use bing_create_service::services::bing::Sleeper;
use bing_create_service::startup::Application;
use secrecy::SecretString;
use service_core::config::Config;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CREATE_PATH: &str = "/images/create";

pub const SIGNED_IN_PAGE: &str = r#"<html><head></head><body>
<div id="id_a" style="display:none"></div>
<script>var _G={IG:"TESTIG",Salt:"TESTSALT"};</script>
</body></html>"#;

pub const READY_IMAGES_PAGE: &str = r#"<html><head><style type="text/css">.x{}</style></head><body>
<div data-selcap="A red fox sitting in fresh snow, watercolor"></div>
<img class="image-row-img" src="/th/id/OIG1.abc?w=270&amp;h=270">
<img class="image-row-img" src="/th/id/OIG1.def?w=270&amp;h=270">
<img src="/rp/logo.svg">
</body></html>"#;

/// Sleeper that returns immediately so poll loops finish at once.
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    /// App with a configured credential and a provider that accepts it.
    pub async fn spawn() -> Self {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CREATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGNED_IN_PAGE))
            .mount(&provider)
            .await;
        Self::spawn_with(provider, "test-u-cookie").await
    }

    /// App without any `_U` credential.
    pub async fn spawn_without_cookie() -> Self {
        Self::spawn_with(MockServer::start().await, "").await
    }

    pub async fn spawn_with(provider: MockServer, cookie: &str) -> Self {
        let config = BingCreateConfig {
            common: Config {
                port: 0,
                environment: "test".to_string(),
            },
            bing: BingConfig {
                cookie_u: SecretString::new(cookie.to_string()),
                base_url: format!("{}{}", provider.uri(), CREATE_PATH),
                origin: provider.uri(),
                image_host: "https://th.bing.com".to_string(),
                cookie_domain: None,
                poll_interval: Duration::from_millis(10),
                poll_interval_gpt4o: Duration::from_millis(10),
                max_poll_attempts: Some(20),
                request_timeout: Duration::from_secs(5),
            },
            tasks: TaskConfig::default(),
            otlp_endpoint: None,
        };

        let app = Application::build_with_sleeper(config, Arc::new(InstantSleeper))
            .await
            .expect("Failed to build test application");
        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            provider,
            client,
        }
    }

    pub async fn post_json(&self, route: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, route))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, route: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, route))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Make the provider answer submissions with a redirect carrying `request_id`.
    pub async fn mount_submission(&self, request_id: &str) {
        Mock::given(method("POST"))
            .and(path(CREATE_PATH))
            .respond_with(ResponseTemplate::new(302).insert_header(
                "location",
                format!("{}?q=test&rt=4&FORM=GENCRE&id={}", CREATE_PATH, request_id).as_str(),
            ))
            .mount(&self.provider)
            .await;
    }

    pub async fn mount_results(&self, request_id: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{}/async/results/{}", CREATE_PATH, request_id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.provider)
            .await;
    }

    /// Poll `/task/:id` until it leaves `processing`.
    pub async fn wait_for_task(&self, task_id: &str) -> serde_json::Value {
        for _ in 0..100 {
            let body: serde_json::Value = self
                .get(&format!("/task/{}", task_id))
                .await
                .json()
                .await
                .expect("Failed to parse JSON");
            if body["data"]["status"] != "processing" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never finished", task_id);
    }
}
