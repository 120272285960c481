//! LLM Assistant service.
//!
//! Wraps a remote OpenAI-compatible chat-completion endpoint (OpenRouter by
//! default). Every failure is turned into a canned sentence in the caller's
//! language; a failed request is not retried.

use crate::config::AppConfig;
use crate::core::language::Language;
use crate::core::traits::ReplyGenerator;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = "You are Krishi Mitra, an AI assistant for Indian farmers. \
Always reply in the same language as the user (Kannada, Hindi, English, Telugu, Malayalam, or Tamil). \
Give short, clear, and helpful answers about farming, weather, fertilizers, and crop diseases. \
If the user uploads an image, describe possible crop diseases or pests and suggest remedies. \
Do not include any symbols or markdown formatting, reply in plain text only.";

pub struct OpenRouterAssistant {
    config: Ref<AppConfig>,
    client: reqwest::Client,
}

#[injectable(ReplyGenerator)]
impl OpenRouterAssistant {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> OpenRouterAssistant {
        OpenRouterAssistant {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
}

#[derive(Serialize, Debug)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Default)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize, Debug, Default)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
    }
}

#[async_trait]
impl ReplyGenerator for OpenRouterAssistant {
    async fn generate_reply(&self, prompt: &str, language: Language) -> String {
        let settings = &self.config.assistant;
        let Some(api_key) = settings.api_key.as_deref() else {
            return language.service_unavailable().to_owned();
        };

        let request = CompletionRequest {
            model: &settings.model,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                CompletionMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&settings.url)
            .bearer_auth(api_key)
            .timeout(settings.timeout)
            .json(&request)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("chat completion request failed: {e}");
                return language.network_failure().to_owned();
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("chat completion endpoint returned {status}: {body}");
            return language.upstream_failure().to_owned();
        }

        match response.json::<CompletionResponse>().await {
            Ok(completion) => {
                let reply = completion.first_content().unwrap_or_default();
                debug!("chat completion returned {} bytes", reply.len());
                if reply.trim().is_empty() {
                    language.no_answer().to_owned()
                } else {
                    reply.trim().to_owned()
                }
            }
            Err(e) => {
                error!("failed to decode chat completion: {e}");
                language.network_failure().to_owned()
            }
        }
    }
}
