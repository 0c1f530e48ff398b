//! Domain core for the KrishiMitr assistant: how a farmer's message is
//! classified, which commodities are understood, and what the fixed replies say.

pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod lexicon;
pub mod messages;

pub use domain::conversation::{ConversationEntry, ConversationId, NewConversation};
pub use domain::price::{PriceAnswer, PriceRecord};
pub use errors::{ProviderError, ProviderKind};
pub use intent::{classify, CommodityMatch, Intent, IntentClassifier};
pub use lexicon::Commodity;
