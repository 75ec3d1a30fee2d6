//! Shared domain types for the divination pipeline.
//!
//! These enums key example buckets, metrics maps and retrieval filters, so all
//! of them are `Copy + Eq + Hash + Ord` and serialize as their lowercase wire
//! form.

use serde::{Deserialize, Serialize};

/// The reading category requested by the caller.
///
/// Selects cultural context, few-shot example buckets and validation floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivinationType {
    /// Tarot card readings (1, 3 or 10 card spreads).
    Tarot,
    /// Spirit card readings (upright/reversed single card).
    Spirit,
    /// Name/phone-number numerology readings.
    Numerology,
    /// Free-form fortune chat.
    Chat,
}

impl DivinationType {
    /// Wire/log form of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tarot => "tarot",
            Self::Spirit => "spirit",
            Self::Numerology => "numerology",
            Self::Chat => "chat",
        }
    }

    /// All divination types, in a fixed order.
    pub fn all() -> &'static [DivinationType] {
        &[Self::Tarot, Self::Spirit, Self::Numerology, Self::Chat]
    }
}

impl std::fmt::Display for DivinationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knowledge-base subsystem a chunk belongs to.
///
/// Declared in document front matter, or inferred from the heading path by the
/// import-time keyword fallback in [`crate::knowledge::chunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemId {
    /// Thai tarot reading system.
    TarotTh,
    /// Thai astrology (ราศี / zodiac) system.
    ThaiAstrology,
    /// Thai numerology (เลขศาสตร์) system.
    NumerologyTh,
    /// Spirit card system.
    SpiritTh,
}

impl SystemId {
    /// Wire form of the system id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TarotTh => "tarot_th",
            Self::ThaiAstrology => "thai_astrology",
            Self::NumerologyTh => "numerology_th",
            Self::SpiritTh => "spirit_th",
        }
    }

    /// Parse the wire form. Returns `None` for unknown ids.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tarot_th" => Some(Self::TarotTh),
            "thai_astrology" => Some(Self::ThaiAstrology),
            "numerology_th" => Some(Self::NumerologyTh),
            "spirit_th" => Some(Self::SpiritTh),
            _ => None,
        }
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question intent recognized by the retriever and the chunk tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Career and work questions.
    Work,
    /// Love and relationship questions.
    Love,
    /// Money and finance questions.
    Money,
    /// Couple-matching (สมพงศ์) questions.
    Matching,
    /// Timing questions (daily/weekly horoscopes, auspicious dates).
    Timing,
}

impl Intent {
    /// Wire form of the intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Love => "love",
            Self::Money => "money",
            Self::Matching => "matching",
            Self::Timing => "timing",
        }
    }

    /// Parse the wire form. Returns `None` for unknown intents.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "work" => Some(Self::Work),
            "love" => Some(Self::Love),
            "money" => Some(Self::Money),
            "matching" => Some(Self::Matching),
            "timing" => Some(Self::Timing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tarot card drawn by the out-of-scope deterministic shuffle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnCard {
    /// Card name, e.g. "The Fool".
    pub name: String,
    /// Whether the card landed reversed.
    #[serde(default)]
    pub reversed: bool,
    /// Spread position label, when the spread assigns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl DrawnCard {
    /// Create an upright card without a position label.
    pub fn upright(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: false,
            position: None,
        }
    }

    /// Create a reversed card without a position label.
    pub fn reversed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: true,
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divination_type_serde_matches_as_str() {
        for t in DivinationType::all() {
            let json = serde_json::to_string(t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn test_system_id_parse() {
        assert_eq!(SystemId::parse("thai_astrology"), Some(SystemId::ThaiAstrology));
        assert_eq!(SystemId::parse("tarot_th"), Some(SystemId::TarotTh));
        assert_eq!(SystemId::parse("unknown"), None);
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("love"), Some(Intent::Love));
        assert_eq!(Intent::parse("nope"), None);
    }
}
