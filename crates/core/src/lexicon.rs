use std::fmt;

use serde::{Deserialize, Serialize};

/// Produce categories the market data provider recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Commodity {
    Onion,
    Potato,
    Tomato,
    Wheat,
    Mustard,
    Paddy,
}

impl Commodity {
    pub const ALL: [Commodity; 6] = [
        Commodity::Onion,
        Commodity::Potato,
        Commodity::Tomato,
        Commodity::Wheat,
        Commodity::Mustard,
        Commodity::Paddy,
    ];

    /// Identifier the provider filters on. Not always the English name.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Onion => "Onion",
            Self::Potato => "Potato",
            Self::Tomato => "Tomato",
            Self::Wheat => "Wheat",
            Self::Mustard => "Mustard",
            Self::Paddy => "Paddy(Dhan)(Common)",
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name())
    }
}

/// Colloquial term to commodity, scanned in slice order. Terms must already be
/// lowercase so they compare against a case-folded message.
pub static COMMODITY_LEXICON: &[(&str, Commodity)] = &[
    ("onion", Commodity::Onion),
    ("pyaaz", Commodity::Onion),
    ("pyaz", Commodity::Onion),
    ("potato", Commodity::Potato),
    ("aloo", Commodity::Potato),
    ("tomato", Commodity::Tomato),
    ("tamatar", Commodity::Tomato),
    ("wheat", Commodity::Wheat),
    ("gehu", Commodity::Wheat),
    ("mustard", Commodity::Mustard),
    ("sarso", Commodity::Mustard),
    ("paddy", Commodity::Paddy),
    ("dhan", Commodity::Paddy),
    ("प्याज", Commodity::Onion),
    ("आलू", Commodity::Potato),
    ("टमाटर", Commodity::Tomato),
    ("गेहूं", Commodity::Wheat),
    ("सरसों", Commodity::Mustard),
    ("धान", Commodity::Paddy),
];

/// First lexicon term contained anywhere in `folded_message` wins. The match is
/// unanchored, so `dhan` also fires inside `dhaniya`.
pub fn lookup_term(folded_message: &str) -> Option<Commodity> {
    COMMODITY_LEXICON
        .iter()
        .find(|(term, _)| folded_message.contains(*term))
        .map(|(_, commodity)| *commodity)
}
