use serde::Serialize;

use crate::lexicon::{lookup_term, Commodity};

/// Words that mark a message as asking for a market rate, in English,
/// transliterated Hindi, and Devanagari.
pub const PRICE_KEYWORDS: &[&str] = &["price", "rate", "bhav", "dam", "daam", "कीमत", "भाव", "दाम"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "commodity", rename_all = "snake_case")]
pub enum CommodityMatch {
    Resolved(Commodity),
    /// Price intent is present but no lexicon term matched.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    NotPriceIntent,
    PriceIntent { commodity: CommodityMatch },
}

impl Intent {
    pub fn is_price_intent(&self) -> bool {
        matches!(self, Self::PriceIntent { .. })
    }

    pub fn commodity(&self) -> Option<Commodity> {
        match self {
            Self::PriceIntent { commodity: CommodityMatch::Resolved(commodity) } => {
                Some(*commodity)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, message: &str) -> Intent {
        classify(message)
    }
}

/// Keyword and commodity matching are both plain substring tests over the
/// case-folded message. `"madam"` carries price intent because it contains
/// `"dam"`; callers get exactly that behaviour.
pub fn classify(message: &str) -> Intent {
    let folded = message.to_lowercase();
    if !has_price_keyword(&folded) {
        return Intent::NotPriceIntent;
    }

    let commodity = match lookup_term(&folded) {
        Some(commodity) => CommodityMatch::Resolved(commodity),
        None => CommodityMatch::Unknown,
    };
    Intent::PriceIntent { commodity }
}

fn has_price_keyword(folded: &str) -> bool {
    PRICE_KEYWORDS.iter().any(|keyword| folded.contains(*keyword))
}
