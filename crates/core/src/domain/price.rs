use serde::{Deserialize, Serialize};

/// One market quotation as the provider returned it. Prices are display
/// strings and are never parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub commodity: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
    #[serde(default)]
    pub modal_price: String,
}

/// Rendered outcome of a price lookup. Kept typed so the caller can decide
/// about caching without inspecting the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PriceAnswer {
    Quotes(String),
    NoData(String),
}

impl PriceAnswer {
    pub fn text(&self) -> &str {
        match self {
            Self::Quotes(text) | Self::NoData(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Quotes(text) | Self::NoData(text) => text,
        }
    }

    pub fn has_quotes(&self) -> bool {
        matches!(self, Self::Quotes(_))
    }
}
