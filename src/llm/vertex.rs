//! Vertex AI chat-completions client
//!
//! Talks to the AI Platform openapi chat endpoint with a metadata-server
//! bearer token. Responses arrive in one of two shapes depending on the
//! routed model family: OpenAI-style `choices` or Gemini-style `candidates`.
//! Both are accepted; anything else is a soft failure for the attempt.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use serde_json::{Value, json};

use crate::auth::TokenProvider;
use crate::config::{Config, ModelRequestConfig};
use crate::llm::client::ModelClient;
use crate::llm::prompt::build_full_prompt;

/// Vertex AI client for generation calls
pub struct VertexClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    endpoint: String,
    region: String,
    model: String,
    knobs: ModelRequestConfig,
}

impl VertexClient {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>, config: &Config) -> Self {
        Self {
            http,
            tokens,
            endpoint: config.ai_platform_endpoint.clone(),
            region: config.google_cloud_region.clone(),
            model: config.ai_model_name.clone(),
            knobs: ModelRequestConfig::default(),
        }
    }

    fn request_body(&self, full_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "stream": false,
            "max_tokens": self.knobs.max_tokens,
            "temperature": self.knobs.temperature,
            "top_p": self.knobs.top_p,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": full_prompt
                        }
                    ]
                }
            ]
        })
    }

    fn completions_url(&self, project_id: &str) -> String {
        format!(
            "https://{}/v1beta1/projects/{}/locations/{}/endpoints/openapi/chat/completions",
            self.endpoint, project_id, self.region
        )
    }
}

#[async_trait]
impl ModelClient for VertexClient {
    async fn generate(
        &self,
        prompt: &str,
        sample_line: &str,
        feedback: Option<&str>,
        project_id: &str,
    ) -> Option<String> {
        info!("Calling model API");

        let token = match self.tokens.token().await {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to authenticate with Google Cloud: {}", e);
                return None;
            }
        };

        if let Some(error_message) = feedback {
            info!("Adding error feedback to prompt: {}", error_message);
        }
        let full_prompt = build_full_prompt(prompt, sample_line, feedback);
        let url = self.completions_url(project_id);

        info!("Sending request to {}", url);
        let response = match self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&self.request_body(&full_prompt))
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => {
                error!("API request failed: {}", e);
                return None;
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to decode API response: {}", e);
                return None;
            }
        };

        match extract_generation_text(&body) {
            Some(text) => {
                info!("Received generation from model API");
                Some(text)
            }
            None => {
                error!("Unexpected API response format");
                None
            }
        }
    }
}

/// Pull the generated text out of either accepted response shape.
///
/// `choices[0].message.content` (OpenAI-compatible) is preferred; falls back
/// to `candidates[0].content.parts[0].text` (Gemini). Returns `None` for any
/// other shape.
pub fn extract_generation_text(body: &Value) -> Option<String> {
    if let Some(content) = body["choices"][0]["message"]["content"].as_str() {
        return Some(content.to_string());
    }
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| text.to_string())
}
