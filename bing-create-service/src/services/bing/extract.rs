//! Pure scraping of Bing Image Creator markup.
//!
//! Everything here takes a raw page (HTML or JSON text) and returns typed
//! values; no I/O happens in this module.

use crate::models::{ImageResult, Model};
use crate::services::bing::poller::PollOutcome;
use crate::services::bing::BingError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Substrings the provider embeds when it refuses a prompt.
pub const REJECTION_MARKERS: [&str; 3] = [
    "girer_center block_icon",
    "data-clarity-tag=\"BlockedByContentPolicy\"",
    "dq-err=\"",
];

/// Present only on the create page of a signed-in session.
pub const AUTH_MARKER: &str = "id=\"id_a\" style=\"display:none\"";

/// GPT-4o result pages stream tiles in; this class is set until they finish.
pub const GPT4O_STREAMING_MARKER: &str = "imgri-inner-container strm";

/// An unfinished result page is a bare shell without its stylesheet.
pub const STYLED_PAGE_MARKER: &str = "text/css";

/// Query suffix every returned image URL is normalised to.
pub const CANONICAL_IMAGE_QUERY: &str = "pid=ImgGn";

const IMAGE_PATH_SEGMENT: &str = "/th/id/";

static RE_IG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"IG:"([^"]+)""#).unwrap());
static RE_SALT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"Salt:"([^"]+)""#).unwrap());
static RE_REQUEST_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"id=([^&"]+)"#).unwrap());
static RE_SELCAP: Lazy<Regex> = Lazy::new(|| Regex::new(r#"data-selcap="([^"]+)""#).unwrap());
static RE_ALT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<img[^>]*class="image-row-img[^"]*"[^>]*alt="([^"]+)""#).unwrap()
});
static RE_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="([^"]+)""#).unwrap());
static RE_VIDEO_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"ourl="([^"]+)""#).unwrap());

/// Session values embedded in the create page's inline scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub ig: Option<String>,
    pub salt: Option<String>,
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_rejected(markup: &str) -> bool {
    REJECTION_MARKERS.iter().any(|m| markup.contains(m))
}

pub fn ensure_not_rejected(markup: &str) -> Result<(), BingError> {
    if is_rejected(markup) {
        return Err(BingError::PromptRejected);
    }
    Ok(())
}

pub fn has_auth_marker(markup: &str) -> bool {
    markup.contains(AUTH_MARKER)
}

pub fn session_tokens(markup: &str) -> SessionTokens {
    SessionTokens {
        ig: first_capture(&RE_IG, markup),
        salt: first_capture(&RE_SALT, markup),
    }
}

/// Absolute follow-up URL for a submission: relative targets hang off `origin`.
pub fn resolve_redirect(target: &str, origin: &str) -> String {
    if target.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), target)
    } else {
        target.to_string()
    }
}

pub fn request_id(url: &str) -> Option<String> {
    first_capture(&RE_REQUEST_ID, url)
}

/// All content image URLs in document order, normalised to the canonical query.
///
/// Decorative images (no query string and no `/th/id/` segment) are dropped.
/// Duplicates are kept.
pub fn image_urls(markup: &str, image_host: &str) -> Vec<String> {
    let host = image_host.trim_end_matches('/');
    RE_SRC
        .captures_iter(markup)
        .filter_map(|c| c.get(1))
        .filter_map(|m| {
            let src = m.as_str();
            let full = if src.starts_with('/') {
                format!("{}{}", host, src)
            } else {
                src.to_string()
            };
            if !full.contains('?') && !full.contains(IMAGE_PATH_SEGMENT) {
                return None;
            }
            let base = full.split('?').next().unwrap_or_default();
            Some(format!("{}?{}", base, CANONICAL_IMAGE_QUERY))
        })
        .collect()
}

/// The provider's rewritten caption: `data-selcap` first, then the tile `alt`.
pub fn enhanced_prompt(markup: &str) -> Option<String> {
    first_capture(&RE_SELCAP, markup).or_else(|| first_capture(&RE_ALT, markup))
}

/// Video URL from either a JSON `showContent` document or an `ourl` attribute.
pub fn video_url(markup: &str) -> Option<String> {
    if markup.contains("showContent") {
        let from_json = serde_json::from_str::<serde_json::Value>(markup)
            .ok()
            .and_then(|v| v.get("showContent")?.as_str().map(str::to_string))
            .filter(|s| !s.is_empty());
        if from_json.is_some() {
            return from_json;
        }
    }
    first_capture(&RE_VIDEO_URL, markup)
}

/// Classify one fetch of an image results page.
pub fn inspect_image_page(
    markup: &str,
    model: Model,
    image_host: &str,
) -> Result<PollOutcome<ImageResult>, BingError> {
    ensure_not_rejected(markup)?;

    if !markup.contains(STYLED_PAGE_MARKER) {
        return Ok(PollOutcome::Pending);
    }
    if model == Model::Gpt4o && markup.contains(GPT4O_STREAMING_MARKER) {
        return Ok(PollOutcome::Pending);
    }

    let images = image_urls(markup, image_host);
    if images.is_empty() {
        return Ok(PollOutcome::Pending);
    }

    Ok(PollOutcome::Ready(ImageResult {
        images,
        enhanced_prompt: enhanced_prompt(markup),
    }))
}

/// Classify one fetch of a video results page.
pub fn inspect_video_page(markup: &str) -> Result<PollOutcome<String>, BingError> {
    ensure_not_rejected(markup)?;

    if markup.contains("errorMessage") && markup.contains("Pending") {
        return Ok(PollOutcome::Pending);
    }

    Ok(match video_url(markup) {
        Some(url) => PollOutcome::Ready(url),
        None => PollOutcome::Pending,
    })
}
