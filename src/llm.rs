//! Chat-completion client used for grounded answers, summaries, and
//! transcript cleanup.
//!
//! The chat capability is consumed through the [`ChatModel`] trait so the
//! pipeline never depends on a concrete provider. The bundled
//! implementation talks to any OpenAI-compatible endpoint.

use crate::config::LlmSettings;
use crate::error::{LektorError, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an API client with the default timeout.
///
/// Uses a 5-minute timeout to prevent hung API calls.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
}

/// Create an API client with a custom timeout and optional base URL.
pub fn create_client_with_timeout(
    timeout: Duration,
    api_base: Option<&str>,
) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }

    Client::with_config(config).with_http_client(http_client)
}

/// Trait for chat-completion capabilities.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one system + user prompt exchange and return the response text.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;
}

/// Chat model backed by an OpenAI-compatible API.
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChat {
    /// Create a chat client from settings.
    ///
    /// Fails with a configuration error when no API credential is set.
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(LektorError::Config(
                "OPENAI_API_KEY not set. Cannot call the chat API.".to_string(),
            ));
        }

        let client = create_client_with_timeout(
            Duration::from_secs(settings.timeout_secs),
            settings.api_base.as_deref(),
        );

        Ok(Self {
            client,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| LektorError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| LektorError::Rag(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| LektorError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LektorError::Provider(format!("Chat API error: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| LektorError::Provider("Empty response from chat API".to_string()))?
            .trim()
            .to_string();

        debug!("Received {} chars from chat API", answer.len());
        Ok(answer)
    }
}
