//! Query string, form body and referer for a generation submission.

use crate::models::{Aspect, GenerationKind, Model};

/// Everything needed to POST one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub query: Vec<(&'static str, String)>,
    pub form: Vec<(&'static str, String)>,
    pub referer: String,
}

impl SubmissionRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        lookup(&self.query, key)
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        lookup(&self.form, key)
    }
}

fn lookup<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

fn base_query(prompt: &str, ig: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![("q", prompt.to_string()), ("FORM", "GENCRE".to_string())];
    if let Some(ig) = ig {
        query.push(("IG", ig.to_string()));
    }
    query
}

/// Image submissions: `rt` is 3 for DALL-E and 4 for every other model.
pub fn image_request(
    base_url: &str,
    prompt: &str,
    model: Model,
    aspect: Aspect,
    ig: Option<&str>,
) -> SubmissionRequest {
    let mut query = base_query(prompt, ig);
    let rt = if model == Model::Dalle { "3" } else { "4" };
    query.push(("rt", rt.to_string()));
    query.push(("mdl", model.code().to_string()));
    query.push(("ar", aspect.code().to_string()));

    SubmissionRequest {
        query,
        form: vec![
            ("q", prompt.to_string()),
            ("model", model.body_name().to_string()),
            ("aspectRatio", aspect.ratio().to_string()),
        ],
        referer: base_url.to_string(),
    }
}

/// Video submissions always go out as DALL-E/square; the provider ignores
/// any other model or ratio for video.
pub fn video_request(base_url: &str, prompt: &str, ig: Option<&str>) -> SubmissionRequest {
    let mut query = base_query(prompt, ig);
    query.extend([
        ("rt", "3".to_string()),
        ("mdl", Model::Dalle.code().to_string()),
        ("ar", Aspect::Square.code().to_string()),
        ("ctype", "video".to_string()),
        ("pt", "3".to_string()),
        ("sm", "0".to_string()),
    ]);

    SubmissionRequest {
        query,
        form: vec![
            ("q", prompt.to_string()),
            ("model", Model::Dalle.body_name().to_string()),
            ("aspectRatio", Aspect::Square.ratio().to_string()),
        ],
        referer: format!("{}?ctype=video", base_url),
    }
}

pub fn build_request(
    base_url: &str,
    prompt: &str,
    model: Model,
    aspect: Aspect,
    kind: GenerationKind,
    ig: Option<&str>,
) -> SubmissionRequest {
    match kind {
        GenerationKind::Image => image_request(base_url, prompt, model, aspect, ig),
        GenerationKind::Video => video_request(base_url, prompt, ig),
    }
}
