//! Scripted providers for tests and offline runs. They never touch the network.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use krishimitr_core::errors::ProviderError;
use krishimitr_core::{Commodity, PriceRecord};

use crate::llm::{Completion, GenerativeClient};
use crate::market::MarketDataProvider;

#[derive(Debug, Default)]
pub struct StaticMarketData {
    records: Vec<PriceRecord>,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(Commodity, usize)>>,
}

impl StaticMarketData {
    pub fn with_records(records: Vec<PriceRecord>) -> Self {
        Self { records, ..Self::default() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(Commodity, usize)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn fetch_records(
        &self,
        commodity: Commodity,
        limit: usize,
    ) -> Result<Vec<PriceRecord>, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((commodity, limit));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.records.iter().take(limit).cloned().collect()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedGenerative {
    completion: Completion,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerative {
    pub fn replying(text: impl Into<String>) -> Self {
        Self { completion: Completion::from_text(text), ..Self::default() }
    }

    pub fn no_candidates() -> Self {
        Self::default()
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(system_directive, prompt)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedGenerative {
    async fn complete(
        &self,
        system_directive: &str,
        prompt: &str,
    ) -> Result<Completion, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((system_directive.to_string(), prompt.to_string()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.completion.clone()),
        }
    }
}
