use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use krishimitr_core::config::MarketConfig;
use krishimitr_core::errors::{ProviderError, ProviderKind};
use krishimitr_core::messages;
use krishimitr_core::{Commodity, PriceAnswer, PriceRecord};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{body_excerpt, build_client, transport_error};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches at most `limit` current quotations for `commodity`, in
    /// provider order.
    async fn fetch_records(
        &self,
        commodity: Commodity,
        limit: usize,
    ) -> Result<Vec<PriceRecord>, ProviderError>;
}

/// data.gov.in daily mandi price resource.
pub struct DataGovMarketClient {
    client: Client,
    base_url: String,
    resource_id: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl DataGovMarketClient {
    pub fn from_config(config: &MarketConfig) -> Result<Self, ProviderError> {
        let client = build_client(ProviderKind::MarketData, config.timeout_secs)?;
        let api_key = config.api_key().map(|key| SecretString::from(key.to_string()));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource_id: config.resource_id.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/resource/{}", self.base_url, self.resource_id)
    }
}

#[derive(Debug, Deserialize)]
struct MarketDataResponse {
    records: Vec<PriceRecord>,
}

#[async_trait]
impl MarketDataProvider for DataGovMarketClient {
    async fn fetch_records(
        &self,
        commodity: Commodity,
        limit: usize,
    ) -> Result<Vec<PriceRecord>, ProviderError> {
        let provider = ProviderKind::MarketData;
        let api_key =
            self.api_key.as_ref().ok_or(ProviderError::MissingCredentials { provider })?;
        let limit = limit.to_string();

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("api-key", api_key.expose_secret()),
                ("format", "json"),
                ("limit", limit.as_str()),
                ("filters[commodity]", commodity.provider_name()),
            ])
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
                event_name = "provider.market.status",
                status = status.as_u16(),
                body = %body_excerpt(&body),
                "market data provider returned an error status"
            );
            return Err(ProviderError::Status { provider, status: status.as_u16() });
        }

        let decoded: MarketDataResponse = serde_json::from_str(&body)
            .map_err(|error| ProviderError::Decode { provider, message: error.to_string() })?;
        debug!(
            event_name = "provider.market.fetched",
            commodity = commodity.provider_name(),
            records = decoded.records.len(),
            "market records received"
        );
        Ok(decoded.records)
    }
}

/// Price lookup adapter: fetches quotations and renders the reply.
#[derive(Clone)]
pub struct PriceLookup {
    provider: Arc<dyn MarketDataProvider>,
    record_limit: usize,
}

impl PriceLookup {
    pub fn new(provider: Arc<dyn MarketDataProvider>, record_limit: usize) -> Self {
        Self { provider, record_limit: record_limit.max(1) }
    }

    pub fn record_limit(&self) -> usize {
        self.record_limit
    }

    pub async fn lookup(&self, commodity: Commodity) -> Result<PriceAnswer, ProviderError> {
        let mut records = self.provider.fetch_records(commodity, self.record_limit).await?;
        records.truncate(self.record_limit);
        Ok(render_price_answer(commodity, &records))
    }
}

pub fn render_price_answer(commodity: Commodity, records: &[PriceRecord]) -> PriceAnswer {
    if records.is_empty() {
        return PriceAnswer::NoData(messages::no_price_data(commodity));
    }

    let mut text = messages::price_header(commodity);
    for record in records {
        // Writing into a String cannot fail.
        let _ = write!(
            text,
            "• **मंडी:** {}, {}\n   **भाव:** ₹{} - ₹{} (आम भाव: ₹{})\n\n",
            record.market, record.state, record.min_price, record.max_price, record.modal_price
        );
    }
    PriceAnswer::Quotes(text)
}
