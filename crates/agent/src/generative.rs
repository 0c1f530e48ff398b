use std::sync::Arc;

use krishimitr_core::errors::ProviderError;

use crate::llm::GenerativeClient;
use crate::persona::SYSTEM_DIRECTIVE;

/// Answers free-form farming questions through a generative model.
#[derive(Clone)]
pub struct GenerativeFallback {
    client: Arc<dyn GenerativeClient>,
    directive: String,
}

impl GenerativeFallback {
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self::with_directive(client, SYSTEM_DIRECTIVE)
    }

    pub fn with_directive(client: Arc<dyn GenerativeClient>, directive: impl Into<String>) -> Self {
        Self { client, directive: directive.into() }
    }

    /// Returns the first textual segment of the first candidate, or an empty
    /// string when the model produced no usable candidate.
    pub async fn generate(&self, message: &str) -> Result<String, ProviderError> {
        let completion = self.client.complete(&self.directive, message).await?;
        Ok(completion.first_text().map(str::to_owned).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use krishimitr_core::errors::{ProviderError, ProviderKind};

    use super::GenerativeFallback;
    use crate::fakes::ScriptedGenerative;
    use crate::persona::SYSTEM_DIRECTIVE;

    #[tokio::test]
    async fn sends_persona_and_message_unchanged() {
        let client = Arc::new(ScriptedGenerative::replying("Neem oil ka chhidkav karein."));
        let fallback = GenerativeFallback::new(client.clone());

        let reply = fallback.generate("Aloo mein keede lag gaye").await.expect("reply");

        assert_eq!(reply, "Neem oil ka chhidkav karein.");
        assert_eq!(
            client.prompts(),
            vec![(SYSTEM_DIRECTIVE.to_string(), "Aloo mein keede lag gaye".to_string())]
        );
    }

    #[tokio::test]
    async fn no_candidate_yields_empty_text() {
        let fallback = GenerativeFallback::new(Arc::new(ScriptedGenerative::no_candidates()));
        assert_eq!(fallback.generate("hello").await.expect("empty reply"), "");
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let failure = ProviderError::Status { provider: ProviderKind::Generative, status: 503 };
        let fallback =
            GenerativeFallback::new(Arc::new(ScriptedGenerative::failing(failure.clone())));

        assert_eq!(fallback.generate("hello").await, Err(failure));
    }
}
