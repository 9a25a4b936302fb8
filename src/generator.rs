//! Chat completions client
//!
//! Speaks the OpenAI-compatible `/chat/completions` endpoint directly over
//! HTTP. Each call sends the mode's system template plus the user prompt and
//! returns the first choice's content.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::prompt::GenMode;
use crate::{Error, Result};

/// Text-generation API client
#[derive(Debug, Clone)]
pub struct Generator {
    client: Client,
    config: GeneratorConfig,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Generator {
    /// Create a generator for the given API settings
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Generate a reply for `prompt` using the mode's template and model
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the API answers with a non-success
    /// status, or the response carries no choices
    pub async fn generate(&self, mode: GenMode, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: mode.model(&self.config).to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: mode.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
        };

        tracing::debug!(?mode, model = %request.model, "requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generator(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generator(format!(
                "completion failed: {status} - {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generator(format!("response parse error: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Generator("response contained no choices".to_string()))
    }
}
