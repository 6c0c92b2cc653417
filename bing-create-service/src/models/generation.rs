use super::{Aspect, Model};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    #[default]
    Image,
    Video,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Image => "image",
            GenerationKind::Video => "video",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(GenerationKind::Image),
            "video" => Ok(GenerationKind::Video),
            other => Err(format!("Invalid type: {}. Use image or video.", other)),
        }
    }
}

/// Image URLs pulled from a finished results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub images: Vec<String>,
    pub enhanced_prompt: Option<String>,
}

/// Outcome of a completed image generation as returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGeneration {
    pub images: Vec<String>,
    /// The provider's enhanced caption, or the submitted prompt.
    pub prompt: String,
    pub model: Model,
    pub aspect: Aspect,
}
