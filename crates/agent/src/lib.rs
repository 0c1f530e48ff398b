//! Query runtime for KrishiMitr.
//!
//! Incoming farmer messages flow through a fixed pipeline:
//! 1. **Classification** (`krishimitr_core::intent`) decides whether the message
//!    asks for a mandi price and, if so, for which commodity.
//! 2. **Price lookup** (`market`) fetches current quotations from data.gov.in and
//!    renders them.
//! 3. **Generative fallback** (`generative`, `llm`) answers everything else
//!    through Gemini with the KrishiMitr persona.
//! 4. **Response cache** (`cache`) records substantive replies in the
//!    background and replays them for offline queries.
//!
//! `runtime::QueryDispatcher` ties the stages together and never fails: every
//! provider or store error becomes a fixed, user-safe reply.

pub mod cache;
pub mod fakes;
pub mod generative;
mod http;
pub mod llm;
pub mod market;
pub mod persona;
pub mod runtime;
#[cfg(test)]
mod test_server;

pub use cache::{ConversationRecorder, Recall, RecorderStats, RecorderWorker, ResponseCache};
pub use generative::GenerativeFallback;
pub use llm::{Completion, GeminiClient, GenerativeClient};
pub use market::{DataGovMarketClient, MarketDataProvider, PriceLookup};
pub use runtime::{ProviderTimeouts, QueryDispatcher, Reply, ReplyKind};
