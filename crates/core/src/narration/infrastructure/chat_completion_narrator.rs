use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::narration::domain::frame_encoder::EncodedImage;
use crate::narration::domain::narrator::{NarrationError, Narrator};
use crate::shared::settings::Settings;

/// Everything needed to reach an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct NarratorConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for NarratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarratorConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NarratorConfig {
    /// Builds a config from settings, reading the API key from the
    /// environment variable the settings name.
    pub fn from_settings(settings: &Settings) -> Result<Self, NarrationError> {
        Self::from_settings_and_key(settings, settings.api_key())
    }

    /// Like [`from_settings`](Self::from_settings) with an already resolved key.
    pub fn from_settings_and_key(
        settings: &Settings,
        api_key: Option<String>,
    ) -> Result<Self, NarrationError> {
        let api_key =
            api_key.ok_or_else(|| NarrationError::MissingApiKey(settings.api_key_env.clone()))?;
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            api_key,
            model: settings.model.clone(),
            system_prompt: settings.system_prompt.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Narrates frames with a single blocking chat completion request.
///
/// The system message carries the instruction; the user message carries
/// one inline `image_url` part per frame, in order.
pub struct ChatCompletionNarrator {
    config: NarratorConfig,
    client: reqwest::blocking::Client,
}

impl ChatCompletionNarrator {
    pub fn new(config: NarratorConfig) -> Result<Self, NarrationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NarrationError::Transport {
                url: config.endpoint.clone(),
                source: e,
            })?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: NarratorConfig, client: reqwest::blocking::Client) -> Self {
        Self { config, client }
    }

    fn transport_error(&self, source: reqwest::Error) -> NarrationError {
        NarrationError::Transport {
            url: self.config.endpoint.clone(),
            source,
        }
    }
}

impl Narrator for ChatCompletionNarrator {
    fn narrate(&self, images: &[EncodedImage]) -> Result<String, NarrationError> {
        if images.is_empty() {
            return Err(NarrationError::NoImages);
        }

        let body = build_request(&self.config, images);
        log::info!(
            "Requesting narration of {} frames from {}",
            images.len(),
            self.config.model
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(NarrationError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}

fn build_request<'a>(config: &'a NarratorConfig, images: &[EncodedImage]) -> ChatRequest<'a> {
    let parts = images
        .iter()
        .map(|img| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: img.to_data_url(),
            },
        })
        .collect();

    ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(&config.system_prompt),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

fn parse_response(text: &str) -> Result<String, NarrationError> {
    let response: ChatResponse = serde_json::from_str(text)
        .map_err(|e| NarrationError::MalformedResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            NarrationError::MalformedResponse("missing choices[0].message.content".to_string())
        })
}
