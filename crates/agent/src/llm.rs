use async_trait::async_trait;
use krishimitr_core::config::GenerativeConfig;
use krishimitr_core::errors::{ProviderError, ProviderKind};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http::{body_excerpt, build_client, transport_error};

/// Candidate texts returned by a generative model, in provider order. Each
/// inner vector holds the textual segments of one candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub candidates: Vec<Vec<String>>,
}

impl Completion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { candidates: vec![vec![text.into()]] }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.candidates.first()?.first().map(String::as_str)
    }
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn complete(
        &self,
        system_directive: &str,
        prompt: &str,
    ) -> Result<Completion, ProviderError>;
}

/// Google Generative Language REST client (`models/{model}:generateContent`).
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn from_config(config: &GenerativeConfig) -> Result<Self, ProviderError> {
        let client = build_client(ProviderKind::Generative, config.timeout_secs)?;
        let api_key = config.api_key().map(|key| SecretString::from(key.to_string()));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn complete(
        &self,
        system_directive: &str,
        prompt: &str,
    ) -> Result<Completion, ProviderError> {
        let provider = ProviderKind::Generative;
        let api_key =
            self.api_key.as_ref().ok_or(ProviderError::MissingCredentials { provider })?;

        let request = GenerateContentRequest {
            system_instruction: Content { role: None, parts: vec![Part { text: system_directive }] },
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|error| transport_error(provider, self.timeout_secs, error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| transport_error(provider, self.timeout_secs, error))?;

        if !status.is_success() {
            warn!(
                event_name = "provider.generative.status",
                status = status.as_u16(),
                body = %body_excerpt(&body),
                "generative provider returned an error status"
            );
            return Err(ProviderError::Status { provider, status: status.as_u16() });
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|error| ProviderError::Decode { provider, message: error.to_string() })?;
        let completion = decoded.into_completion();
        debug!(
            event_name = "provider.generative.completed",
            model = %self.model,
            candidates = completion.candidates.len(),
            "generative completion received"
        );
        Ok(completion)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_completion(self) -> Completion {
        let candidates = self
            .candidates
            .into_iter()
            .map(|candidate| {
                candidate
                    .content
                    .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
                    .unwrap_or_default()
            })
            .collect();
        Completion { candidates }
    }
}
