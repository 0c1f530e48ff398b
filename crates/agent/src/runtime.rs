use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use krishimitr_core::config::AppConfig;
use krishimitr_core::errors::{ProviderError, ProviderKind};
use krishimitr_core::messages;
use krishimitr_core::{Commodity, CommodityMatch, Intent, IntentClassifier, PriceAnswer};
use krishimitr_db::ConversationRepository;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{Recall, RecorderWorker, ResponseCache};
use crate::generative::GenerativeFallback;
use crate::llm::GeminiClient;
use crate::market::{DataGovMarketClient, PriceLookup};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    PriceQuotes,
    NoPriceData,
    Clarification,
    Generated,
    PriceUnavailable,
    GenerationFailed,
    OfflineHit,
    OfflineMiss,
    OfflineUnavailable,
}

impl ReplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceQuotes => "price_quotes",
            Self::NoPriceData => "no_price_data",
            Self::Clarification => "clarification",
            Self::Generated => "generated",
            Self::PriceUnavailable => "price_unavailable",
            Self::GenerationFailed => "generation_failed",
            Self::OfflineHit => "offline_hit",
            Self::OfflineMiss => "offline_miss",
            Self::OfflineUnavailable => "offline_unavailable",
        }
    }

    /// Only substantive online answers are worth replaying offline.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::PriceQuotes | Self::Generated)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self { text: text.into(), kind }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub market: Duration,
    pub generative: Duration,
}

impl ProviderTimeouts {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            market: Duration::from_secs(config.market.timeout_secs),
            generative: Duration::from_secs(config.generative.timeout_secs),
        }
    }
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self { market: Duration::from_secs(10), generative: Duration::from_secs(20) }
    }
}

/// Routes each message to the price lookup, the generative fallback, or the
/// offline cache. Every path yields a `Reply`; provider and store failures
/// become fixed apologies and are logged here.
#[derive(Clone)]
pub struct QueryDispatcher {
    classifier: IntentClassifier,
    prices: PriceLookup,
    fallback: GenerativeFallback,
    cache: ResponseCache,
    timeouts: ProviderTimeouts,
}

impl QueryDispatcher {
    pub fn new(
        prices: PriceLookup,
        fallback: GenerativeFallback,
        cache: ResponseCache,
        timeouts: ProviderTimeouts,
    ) -> Self {
        Self { classifier: IntentClassifier::new(), prices, fallback, cache, timeouts }
    }

    /// Wires the production providers from `config` over `repository` and
    /// spawns the recorder worker. Missing credentials do not fail here.
    pub fn from_config(
        config: &AppConfig,
        repository: Arc<dyn ConversationRepository>,
    ) -> Result<(Self, RecorderWorker), ProviderError> {
        let market = DataGovMarketClient::from_config(&config.market)?;
        let generative = GeminiClient::from_config(&config.generative)?;
        let (cache, worker) = ResponseCache::spawn(repository);

        let dispatcher = Self::new(
            PriceLookup::new(Arc::new(market), config.market.record_limit),
            GenerativeFallback::new(Arc::new(generative)),
            cache,
            ProviderTimeouts::from_config(config),
        );
        Ok((dispatcher, worker))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn online_query(&self, message: &str) -> Reply {
        let correlation_id = new_correlation_id();
        let intent = self.classifier.classify(message);
        info!(
            event_name = "chat.online.received",
            correlation_id = %correlation_id,
            intent = ?intent,
            message_chars = message.chars().count(),
            "online query received"
        );

        let reply = match intent {
            Intent::PriceIntent { commodity: CommodityMatch::Unknown } => {
                Reply::new(ReplyKind::Clarification, messages::CLARIFICATION_PROMPT)
            }
            Intent::PriceIntent { commodity: CommodityMatch::Resolved(commodity) } => {
                self.answer_price(commodity, &correlation_id).await
            }
            Intent::NotPriceIntent => self.answer_generative(message, &correlation_id).await,
        };

        let cached = reply.kind.is_cacheable();
        if cached {
            self.cache.record(message, &reply.text);
        }
        info!(
            event_name = "chat.online.replied",
            correlation_id = %correlation_id,
            reply_kind = reply.kind.as_str(),
            cached,
            "online query answered"
        );
        reply
    }

    pub async fn offline_query(&self, message: &str) -> Reply {
        let correlation_id = new_correlation_id();
        match self.cache.recall_best_match(message).await {
            Ok(Recall::Hit { reply, entry }) => {
                info!(
                    event_name = "chat.offline.hit",
                    correlation_id = %correlation_id,
                    conversation_id = entry.id.0,
                    "offline reply served from cache"
                );
                Reply::new(ReplyKind::OfflineHit, reply)
            }
            Ok(Recall::NoMatch) => {
                info!(
                    event_name = "chat.offline.miss",
                    correlation_id = %correlation_id,
                    "no cached reply matched"
                );
                Reply::new(ReplyKind::OfflineMiss, messages::OFFLINE_NO_MATCH)
            }
            Err(error) => {
                warn!(
                    event_name = "chat.offline.store_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "offline cache lookup failed"
                );
                Reply::new(ReplyKind::OfflineUnavailable, messages::OFFLINE_UNAVAILABLE)
            }
        }
    }

    async fn answer_price(&self, commodity: Commodity, correlation_id: &str) -> Reply {
        let lookup = within(
            self.timeouts.market,
            ProviderKind::MarketData,
            self.prices.lookup(commodity),
        )
        .await;

        match lookup {
            Ok(PriceAnswer::Quotes(text)) => Reply::new(ReplyKind::PriceQuotes, text),
            Ok(PriceAnswer::NoData(text)) => Reply::new(ReplyKind::NoPriceData, text),
            Err(error) => {
                log_provider_failure(&error, correlation_id);
                Reply::new(ReplyKind::PriceUnavailable, error.user_message())
            }
        }
    }

    async fn answer_generative(&self, message: &str, correlation_id: &str) -> Reply {
        let generated = within(
            self.timeouts.generative,
            ProviderKind::Generative,
            self.fallback.generate(message),
        )
        .await;

        match generated {
            Ok(text) if !text.trim().is_empty() => Reply::new(ReplyKind::Generated, text),
            Ok(_) => {
                warn!(
                    event_name = "provider.generative.empty",
                    correlation_id = %correlation_id,
                    "generative provider returned no usable candidate"
                );
                Reply::new(ReplyKind::GenerationFailed, messages::GENERATION_FAILED)
            }
            Err(error) => {
                log_provider_failure(&error, correlation_id);
                Reply::new(ReplyKind::GenerationFailed, error.user_message())
            }
        }
    }
}

async fn within<T>(
    limit: Duration,
    provider: ProviderKind,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ProviderError::Timeout { provider, timeout_secs: limit.as_secs() }))
}

fn log_provider_failure(error: &ProviderError, correlation_id: &str) {
    warn!(
        event_name = "provider.call.failed",
        correlation_id = %correlation_id,
        provider = error.provider().as_str(),
        error_class = error.error_class(),
        error = %error,
        "provider call failed"
    );
}

fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use krishimitr_core::config::AppConfig;
    use krishimitr_core::errors::{ProviderError, ProviderKind};
    use krishimitr_core::messages;
    use krishimitr_core::{Commodity, PriceRecord};
    use krishimitr_db::{ConversationRepository, InMemoryConversationRepository};

    use super::{ProviderTimeouts, QueryDispatcher, ReplyKind};
    use crate::cache::ResponseCache;
    use crate::fakes::{ScriptedGenerative, StaticMarketData};
    use crate::generative::GenerativeFallback;
    use crate::market::PriceLookup;

    struct Harness {
        dispatcher: QueryDispatcher,
        market: Arc<StaticMarketData>,
        generative: Arc<ScriptedGenerative>,
        repository: Arc<InMemoryConversationRepository>,
    }

    fn harness(market: StaticMarketData, generative: ScriptedGenerative) -> Harness {
        harness_with_timeouts(market, generative, ProviderTimeouts::default())
    }

    fn harness_with_timeouts(
        market: StaticMarketData,
        generative: ScriptedGenerative,
        timeouts: ProviderTimeouts,
    ) -> Harness {
        let market = Arc::new(market);
        let generative = Arc::new(generative);
        let repository = Arc::new(InMemoryConversationRepository::default());
        let (cache, _worker) = ResponseCache::spawn(repository.clone());
        let dispatcher = QueryDispatcher::new(
            PriceLookup::new(market.clone(), 5),
            GenerativeFallback::new(generative.clone()),
            cache,
            timeouts,
        );
        Harness { dispatcher, market, generative, repository }
    }

    fn onion_record(market: &str) -> PriceRecord {
        PriceRecord {
            state: "Maharashtra".to_string(),
            market: market.to_string(),
            commodity: "Onion".to_string(),
            min_price: "1000".to_string(),
            max_price: "1600".to_string(),
            modal_price: "1350".to_string(),
        }
    }

    async fn stored(harness: &Harness) -> u64 {
        harness.dispatcher.cache().flush().await;
        harness.repository.count().await.expect("count")
    }

    #[tokio::test]
    async fn unknown_commodity_asks_for_clarification_without_calls() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::replying("unused"));

        let reply = h.dispatcher.online_query("price of bananas").await;

        assert_eq!(reply.kind, ReplyKind::Clarification);
        assert_eq!(reply.text, messages::CLARIFICATION_PROMPT);
        assert!(h.market.calls().is_empty());
        assert!(h.generative.prompts().is_empty());
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn price_question_with_no_records_names_commodity_and_is_not_cached() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::replying("unused"));

        let reply = h.dispatcher.online_query("pyaaz ka bhav kya hai").await;

        assert_eq!(reply.kind, ReplyKind::NoPriceData);
        assert!(reply.text.contains("Onion"));
        assert_eq!(h.market.calls(), vec![(Commodity::Onion, 5)]);
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn price_quotes_are_rendered_and_cached_once() {
        let h = harness(
            StaticMarketData::with_records(vec![onion_record("Lasalgaon"), onion_record("Pune")]),
            ScriptedGenerative::replying("unused"),
        );

        let reply = h.dispatcher.online_query("onion rate today").await;

        assert_eq!(reply.kind, ReplyKind::PriceQuotes);
        assert!(reply.text.starts_with("'Onion' के ताज़ा भाव:"));
        assert!(reply.text.contains("Lasalgaon"));
        assert_eq!(stored(&h).await, 1);
        let entries = h.repository.entries().await;
        assert_eq!(entries[0].query, "onion rate today");
        assert_eq!(entries[0].reply, reply.text);
    }

    #[tokio::test]
    async fn market_failure_yields_price_unavailable() {
        let failure = ProviderError::Status { provider: ProviderKind::MarketData, status: 502 };
        let h = harness(StaticMarketData::failing(failure), ScriptedGenerative::replying("unused"));

        let reply = h.dispatcher.online_query("aloo ka bhav").await;

        assert_eq!(reply.kind, ReplyKind::PriceUnavailable);
        assert_eq!(reply.text, messages::PRICE_UNAVAILABLE);
        assert!(!reply.text.contains("502"));
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn missing_market_key_yields_price_unavailable() {
        let failure = ProviderError::MissingCredentials { provider: ProviderKind::MarketData };
        let h = harness(StaticMarketData::failing(failure), ScriptedGenerative::replying("unused"));

        let reply = h.dispatcher.online_query("gehu ka daam").await;

        assert_eq!(reply.kind, ReplyKind::PriceUnavailable);
    }

    #[tokio::test]
    async fn slow_market_times_out() {
        let h = harness_with_timeouts(
            StaticMarketData::with_records(vec![onion_record("Pune")])
                .delayed(Duration::from_secs(5)),
            ScriptedGenerative::replying("unused"),
            ProviderTimeouts {
                market: Duration::from_millis(50),
                generative: Duration::from_secs(20),
            },
        );

        let reply = h.dispatcher.online_query("onion price").await;

        assert_eq!(reply.kind, ReplyKind::PriceUnavailable);
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn general_question_is_answered_by_generative_fallback_and_cached() {
        let h = harness(
            StaticMarketData::empty(),
            ScriptedGenerative::replying("Neem oil ka chhidkav karein."),
        );

        let reply = h.dispatcher.online_query("Aloo mein keede lag gaye hain").await;

        assert_eq!(reply.kind, ReplyKind::Generated);
        assert_eq!(reply.text, "Neem oil ka chhidkav karein.");
        assert!(h.market.calls().is_empty());
        assert_eq!(stored(&h).await, 1);
    }

    #[tokio::test]
    async fn no_candidate_yields_generation_failed_without_write() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::no_candidates());

        let reply = h.dispatcher.online_query("When should I sow wheat?").await;

        assert_eq!(reply.kind, ReplyKind::GenerationFailed);
        assert_eq!(reply.text, messages::GENERATION_FAILED);
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn whitespace_only_candidate_counts_as_empty() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::replying("  \n "));

        let reply = h.dispatcher.online_query("hello").await;

        assert_eq!(reply.kind, ReplyKind::GenerationFailed);
        assert_eq!(stored(&h).await, 0);
    }

    #[tokio::test]
    async fn generative_errors_and_timeouts_yield_generation_failed() {
        let failure = ProviderError::MissingCredentials { provider: ProviderKind::Generative };
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::failing(failure));
        assert_eq!(h.dispatcher.online_query("hello").await.kind, ReplyKind::GenerationFailed);

        let slow = harness_with_timeouts(
            StaticMarketData::empty(),
            ScriptedGenerative::replying("late").delayed(Duration::from_secs(5)),
            ProviderTimeouts {
                market: Duration::from_secs(10),
                generative: Duration::from_millis(50),
            },
        );
        let reply = slow.dispatcher.online_query("hello").await;
        assert_eq!(reply.kind, ReplyKind::GenerationFailed);
        assert_eq!(stored(&slow).await, 0);
    }

    #[tokio::test]
    async fn cached_entries_match_substantive_replies() {
        let h = harness(
            StaticMarketData::with_records(vec![onion_record("Nashik")]),
            ScriptedGenerative::replying("Mitti ki jaanch karwayein."),
        );
        let messages = [
            "onion bhav",
            "price of bananas",
            "khet ki mitti kaisi ho",
            "pyaz ka rate",
            "sinchai kab karein",
        ];

        let mut substantive = 0;
        for message in messages {
            if h.dispatcher.online_query(message).await.kind.is_cacheable() {
                substantive += 1;
            }
        }

        assert_eq!(substantive, 4);
        assert_eq!(stored(&h).await, substantive);
    }

    #[tokio::test]
    async fn offline_query_replays_cached_reply_with_annotation() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::replying("Urea 2 baar daalein."));

        h.dispatcher.online_query("gehu mein khad kitni daalein").await;
        h.dispatcher.cache().flush().await;
        let reply = h.dispatcher.offline_query("khad kitni").await;

        assert_eq!(reply.kind, ReplyKind::OfflineHit);
        assert_eq!(reply.text, format!("Urea 2 baar daalein.{}", messages::OFFLINE_ANNOTATION));
    }

    #[tokio::test]
    async fn offline_query_prefers_the_most_recent_match() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::no_candidates());
        let cache = h.dispatcher.cache();

        cache.record("dhan ki sinchai", "pehla jawab");
        cache.flush().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.record("dhan ki sinchai kab", "doosra jawab");
        cache.flush().await;

        let reply = h.dispatcher.offline_query("sinchai").await;
        assert!(reply.text.starts_with("doosra jawab"));
    }

    #[tokio::test]
    async fn offline_query_without_match_says_so() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::no_candidates());

        let reply = h.dispatcher.offline_query("kuch bhi").await;

        assert_eq!(reply.kind, ReplyKind::OfflineMiss);
        assert_eq!(reply.text, messages::OFFLINE_NO_MATCH);
    }

    #[tokio::test]
    async fn offline_query_reports_store_failure() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::no_candidates());
        h.repository.set_unavailable(true);

        let reply = h.dispatcher.offline_query("sinchai").await;

        assert_eq!(reply.kind, ReplyKind::OfflineUnavailable);
        assert_eq!(reply.text, messages::OFFLINE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn production_wiring_without_keys_degrades_to_apologies() {
        let repository = Arc::new(InMemoryConversationRepository::default());
        let (dispatcher, _worker) =
            QueryDispatcher::from_config(&AppConfig::default(), repository.clone())
                .expect("clients build without keys");

        let price = dispatcher.online_query("aloo ka bhav").await;
        let general = dispatcher.online_query("hello").await;
        dispatcher.cache().flush().await;

        assert_eq!(price.kind, ReplyKind::PriceUnavailable);
        assert_eq!(general.kind, ReplyKind::GenerationFailed);
        assert_eq!(repository.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_change_the_reply() {
        let h = harness(StaticMarketData::empty(), ScriptedGenerative::replying("Jawab."));
        h.repository.set_unavailable(true);

        let reply = h.dispatcher.online_query("mausam kaisa rahega").await;
        h.dispatcher.cache().flush().await;

        assert_eq!(reply.kind, ReplyKind::Generated);
        assert_eq!(reply.text, "Jawab.");
        assert_eq!(h.dispatcher.cache().stats().failed(), 1);
    }
}
