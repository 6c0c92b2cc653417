use secrecy::{ExposeSecret, SecretString};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.bing.com/images/create";
pub const DEFAULT_ORIGIN: &str = "https://www.bing.com";
pub const DEFAULT_IMAGE_HOST: &str = "https://th.bing.com";
pub const DEFAULT_COOKIE_DOMAIN: &str = ".bing.com";

const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_POLL_INTERVAL_GPT4O_MS: u64 = 3_000;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct BingCreateConfig {
    pub common: core_config::Config,
    pub bing: BingConfig,
    pub tasks: TaskConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BingConfig {
    /// The `_U` session credential copied from a signed-in browser.
    pub cookie_u: SecretString,
    pub base_url: String,
    pub origin: String,
    pub image_host: String,
    /// `Domain` attribute for injected cookies; `None` keeps them host-only.
    pub cookie_domain: Option<String>,
    pub poll_interval: Duration,
    pub poll_interval_gpt4o: Duration,
    /// Upper bound on result-page fetches per generation; `None` polls forever.
    pub max_poll_attempts: Option<u32>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TaskConfig {
    /// Finished video tasks older than this are evicted; `None` keeps them forever.
    pub ttl: Option<Duration>,
}

impl Default for BingConfig {
    fn default() -> Self {
        Self {
            cookie_u: SecretString::new(String::new()),
            base_url: DEFAULT_BASE_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            cookie_domain: Some(DEFAULT_COOKIE_DOMAIN.to_string()),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_interval_gpt4o: Duration::from_millis(DEFAULT_POLL_INTERVAL_GPT4O_MS),
            max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl BingConfig {
    pub fn has_cookie(&self) -> bool {
        !self.cookie_u.expose_secret().trim().is_empty()
    }
}

impl BingCreateConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_prod();

        // Endpoints must be explicit in prod; tunables always fall back.
        let cookie_domain = get_env("BING_COOKIE_DOMAIN", Some(DEFAULT_COOKIE_DOMAIN), is_prod)?;
        let max_poll_attempts =
            parse_env("BING_MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS)?;
        let task_ttl_secs: u64 = parse_env("TASK_TTL_SECS", 0)?;

        Ok(BingCreateConfig {
            common,
            bing: BingConfig {
                cookie_u: SecretString::new(env::var("BING_COOKIE_U").unwrap_or_default()),
                base_url: get_env("BING_BASE_URL", Some(DEFAULT_BASE_URL), is_prod)?,
                origin: get_env("BING_ORIGIN", Some(DEFAULT_ORIGIN), is_prod)?,
                image_host: get_env("BING_IMAGE_HOST", Some(DEFAULT_IMAGE_HOST), is_prod)?,
                cookie_domain: Some(cookie_domain).filter(|d| !d.is_empty()),
                poll_interval: Duration::from_millis(parse_env(
                    "BING_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )?),
                poll_interval_gpt4o: Duration::from_millis(parse_env(
                    "BING_POLL_INTERVAL_GPT4O_MS",
                    DEFAULT_POLL_INTERVAL_GPT4O_MS,
                )?),
                max_poll_attempts: Some(max_poll_attempts).filter(|n| *n > 0),
                request_timeout: Duration::from_secs(parse_env(
                    "BING_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?),
            },
            tasks: TaskConfig {
                ttl: Some(Duration::from_secs(task_ttl_secs)).filter(|d| !d.is_zero()),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), false)?
        .trim()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}
