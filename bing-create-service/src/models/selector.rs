//! Model and aspect-ratio selectors with their provider codes.

use crate::services::bing::BingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A selector as supplied by an API client: a symbolic name or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SelectorInput {
    Code(i64),
    Name(String),
}

impl fmt::Display for SelectorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorInput::Code(code) => write!(f, "{}", code),
            SelectorInput::Name(name) => f.write_str(name),
        }
    }
}

impl SelectorInput {
    /// Numeric codes may arrive as strings from form-encoded bodies.
    fn as_code(&self) -> Option<i64> {
        match self {
            SelectorInput::Code(code) => Some(*code),
            SelectorInput::Name(name) => name.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Model {
    #[default]
    #[serde(rename = "DALLE")]
    Dalle,
    #[serde(rename = "GPT4O")]
    Gpt4o,
    #[serde(rename = "MAI1")]
    Mai1,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::Dalle, Model::Gpt4o, Model::Mai1];

    pub fn code(self) -> u8 {
        match self {
            Model::Dalle => 0,
            Model::Gpt4o => 1,
            Model::Mai1 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Model::Dalle => "DALLE",
            Model::Gpt4o => "GPT4O",
            Model::Mai1 => "MAI1",
        }
    }

    /// Value of the `model` form field.
    pub fn body_name(self) -> &'static str {
        match self {
            Model::Dalle => "dalle",
            Model::Gpt4o => "gpt4o",
            Model::Mai1 => "maiimage1",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Model::Dalle => "DALL-E, fast and general purpose",
            Model::Gpt4o => "GPT-4o, higher quality but slower",
            Model::Mai1 => "MAI Image 1, Microsoft model",
        }
    }

    pub fn from_selector(input: &SelectorInput) -> Result<Self, BingError> {
        let found = match input.as_code() {
            Some(code) => Self::ALL.into_iter().find(|m| i64::from(m.code()) == code),
            None => match input {
                SelectorInput::Name(name) => Self::ALL
                    .into_iter()
                    .find(|m| m.name().eq_ignore_ascii_case(name.trim())),
                SelectorInput::Code(_) => None,
            },
        };
        found.ok_or_else(|| BingError::InvalidModel(input.to_string()))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Aspect {
    #[default]
    #[serde(rename = "SQUARE")]
    Square,
    #[serde(rename = "LANDSCAPE")]
    Landscape,
    #[serde(rename = "PORTRAIT")]
    Portrait,
}

impl Aspect {
    pub const ALL: [Aspect; 3] = [Aspect::Square, Aspect::Landscape, Aspect::Portrait];

    pub fn code(self) -> u8 {
        match self {
            Aspect::Square => 1,
            Aspect::Landscape => 2,
            Aspect::Portrait => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Aspect::Square => "SQUARE",
            Aspect::Landscape => "LANDSCAPE",
            Aspect::Portrait => "PORTRAIT",
        }
    }

    /// Value of the `aspectRatio` form field.
    pub fn ratio(self) -> &'static str {
        match self {
            Aspect::Square => "1:1",
            Aspect::Landscape => "7:4",
            Aspect::Portrait => "4:7",
        }
    }

    pub fn from_selector(input: &SelectorInput) -> Result<Self, BingError> {
        let found = match input.as_code() {
            Some(code) => Self::ALL.into_iter().find(|a| i64::from(a.code()) == code),
            None => match input {
                SelectorInput::Name(name) => Self::ALL
                    .into_iter()
                    .find(|a| a.name().eq_ignore_ascii_case(name.trim())),
                SelectorInput::Code(_) => None,
            },
        };
        found.ok_or_else(|| BingError::InvalidAspect(input.to_string()))
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
