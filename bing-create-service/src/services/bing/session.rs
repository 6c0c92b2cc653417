use super::extract;
use super::BingError;
use crate::config::BingConfig;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Url};
use secrecy::ExposeSecret;
use std::sync::Arc;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

/// Authenticated browser-like session against the provider.
///
/// Both HTTP clients share one cookie jar; `http_manual` does not follow
/// redirects so the submission `Location` header can be read.
#[derive(Clone, Debug)]
pub struct Session {
    config: Arc<BingConfig>,
    origin: Url,
    http: Client,
    http_manual: Client,
    ig: Option<String>,
    salt: Option<String>,
    established: bool,
}

/// Cheap copy of what a submit/poll sequence needs, taken under a short lock.
#[derive(Clone)]
pub struct SessionHandle {
    pub http: Client,
    pub http_manual: Client,
    pub ig: Option<String>,
}

impl Session {
    pub fn new(config: Arc<BingConfig>) -> Result<Self, BingError> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| BingError::Config(format!("BING_ORIGIN {}: {}", config.origin, e)))?;
        let (http, http_manual) = build_clients(&config, &origin, Arc::new(Jar::default()))?;

        Ok(Self {
            config,
            origin,
            http,
            http_manual,
            ig: None,
            salt: None,
            established: false,
        })
    }

    pub fn check_cookie(&self) -> Result<(), BingError> {
        if !self.config.has_cookie() {
            return Err(BingError::AuthCookie(
                "Cookie _U is not set. Configure BING_COOKIE_U.".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the create page with the `_U` credential on a fresh cookie jar
    /// and return the signed-in session it yields.
    ///
    /// `self` is left untouched, so callers can keep serving reads from the
    /// current session while the bootstrap request is in flight. Tokens the
    /// new page does not carry are inherited from `self`.
    #[tracing::instrument(skip(self))]
    pub async fn establish(&self) -> Result<Session, BingError> {
        self.check_cookie()?;

        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(
            &self.cookie(&format!("_U={}", self.config.cookie_u.expose_secret())),
            &self.origin,
        );
        let (http, http_manual) = build_clients(&self.config, &self.origin, jar.clone())?;

        let html = http
            .get(&self.config.base_url)
            .send()
            .await?
            .text()
            .await?;

        if !extract::has_auth_marker(&html) {
            tracing::warn!("Create page did not carry the signed-in marker");
            return Err(BingError::AuthCookie(
                "Authentication failed. _U cookie is invalid or expired.".to_string(),
            ));
        }

        let tokens = extract::session_tokens(&html);
        let ig = tokens.ig.or_else(|| self.ig.clone());
        let salt = tokens.salt.or_else(|| self.salt.clone());

        let preferences = format!(
            "SRCHLANG=ru&HV={}&HVE={}&IG={}",
            chrono::Utc::now().timestamp(),
            salt.as_deref().unwrap_or_default(),
            ig.as_deref().unwrap_or_default(),
        );
        jar.add_cookie_str(
            &self.cookie(&format!(
                "SRCHHPGUSR={}",
                urlencoding::encode(&preferences)
            )),
            &self.origin,
        );

        tracing::info!(has_ig = ig.is_some(), "Bing session established");
        Ok(Session {
            config: self.config.clone(),
            origin: self.origin.clone(),
            http,
            http_manual,
            ig,
            salt,
            established: true,
        })
    }

    /// Forget the session so the next generation call runs `setup` again.
    pub fn invalidate(&mut self) {
        self.ig = None;
        self.salt = None;
        self.established = false;
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            http: self.http.clone(),
            http_manual: self.http_manual.clone(),
            ig: self.ig.clone(),
        }
    }

    fn cookie(&self, pair: &str) -> String {
        match &self.config.cookie_domain {
            Some(domain) => format!("{}; Domain={}; Path=/", pair, domain),
            None => format!("{}; Path=/", pair),
        }
    }
}

fn default_headers(config: &BingConfig, origin: &Url) -> Result<HeaderMap, BingError> {
    let header = |value: &str| {
        HeaderValue::from_str(value)
            .map_err(|e| BingError::Config(format!("invalid header value {}: {}", value, e)))
    };

    let mut headers = HeaderMap::new();
    if let Some(host) = origin.host_str() {
        headers.insert(HeaderName::from_static("authority"), header(host)?);
    }
    headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(reqwest::header::ORIGIN, header(&config.origin)?);
    headers.insert(reqwest::header::REFERER, header(&config.base_url)?);
    headers.insert(
        reqwest::header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    Ok(headers)
}

fn build_clients(
    config: &BingConfig,
    origin: &Url,
    jar: Arc<Jar>,
) -> Result<(Client, Client), BingError> {
    let headers = default_headers(config, origin)?;

    let http = Client::builder()
        .cookie_provider(jar.clone())
        .default_headers(headers.clone())
        .timeout(config.request_timeout)
        .build()?;
    let http_manual = Client::builder()
        .cookie_provider(jar)
        .default_headers(headers)
        .timeout(config.request_timeout)
        .redirect(redirect::Policy::none())
        .build()?;

    Ok((http, http_manual))
}
