//! Generation requests and the JSON body sent to inference endpoints.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// What is being generated. Selects the endpoint list and timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// File extension for generated output.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text prompt plus optional negative prompt and named parameters.
///
/// Parameters set here override the pipeline defaults key by key.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub parameters: BTreeMap<String, Value>,
}

impl MediaRequest {
    #[must_use]
    pub fn new(kind: MediaKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            negative_prompt: None,
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(MediaKind::Image, prompt)
    }

    #[must_use]
    pub fn video(prompt: impl Into<String>) -> Self {
        Self::new(MediaKind::Video, prompt)
    }

    /// Blank negative prompts are dropped.
    #[must_use]
    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        let negative = negative.into();
        self.negative_prompt = (!negative.trim().is_empty()).then_some(negative);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_size(self, size: SizePreset) -> Self {
        let (width, height) = size.dimensions();
        self.with_parameter("width", width)
            .with_parameter("height", height)
    }

    #[must_use]
    pub fn with_length(self, length: VideoLength) -> Self {
        self.with_parameter("num_frames", length.frames())
    }

    /// Reject requests that would be pointless to send.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::invalid_input("prompt must not be empty"));
        }
        Ok(())
    }

    /// Request body: `{"inputs": prompt, "parameters": {...}}`.
    #[must_use]
    pub fn payload(&self, defaults: &BTreeMap<String, Value>) -> Value {
        let mut parameters: Map<String, Value> = defaults
            .iter()
            .chain(&self.parameters)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(negative) = &self.negative_prompt {
            parameters.insert("negative_prompt".into(), Value::from(negative.as_str()));
        }
        serde_json::json!({
            "inputs": self.prompt,
            "parameters": parameters,
        })
    }
}

/// Output sizes offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePreset {
    #[default]
    Square,
    Portrait,
    Landscape,
    Wide,
}

impl SizePreset {
    pub const ALL: [Self; 4] = [Self::Square, Self::Portrait, Self::Landscape, Self::Wide];

    #[must_use]
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Portrait => (768, 1024),
            Self::Landscape => (1024, 768),
            Self::Wide => (1280, 720),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::Wide => "wide",
        }
    }
}

impl fmt::Display for SizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{w}x{h} ({})", self.name())
    }
}

/// Accepts a preset name (`portrait`) or its dimensions (`768x1024`).
impl FromStr for SizePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| {
                let (w, h) = preset.dimensions();
                needle == preset.name() || needle == format!("{w}x{h}")
            })
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unknown size `{s}`; expected one of square, portrait, landscape, wide"
                ))
            })
    }
}

/// Video lengths offered to users, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoLength {
    #[default]
    Short,
    Medium,
    Long,
}

impl VideoLength {
    pub const ALL: [Self; 3] = [Self::Short, Self::Medium, Self::Long];

    #[must_use]
    pub fn frames(self) -> u32 {
        match self {
            Self::Short => 16,
            Self::Medium => 24,
            Self::Long => 32,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for VideoLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frames ({})", self.frames(), self.name())
    }
}

impl FromStr for VideoLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|len| needle == len.name() || needle == len.frames().to_string())
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unknown length `{s}`; expected short, medium or long"
                ))
            })
    }
}
