//! Company pricing tiers (`taux`).

use serde::{Deserialize, Deserializer, Serialize};

/// Pricing category of a company, selecting which of a product's tier prices
/// applies to its accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "taux1")]
    Tier1,
    #[serde(rename = "taux2")]
    Tier2,
    #[serde(rename = "taux3")]
    Tier3,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::Tier1, Self::Tier2, Self::Tier3];

    /// Wire value used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tier1 => "taux1",
            Self::Tier2 => "taux2",
            Self::Tier3 => "taux3",
        }
    }

    /// Parse a tier tag, treating anything unrecognized as untagged.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "taux1" => Some(Self::Tier1),
            "taux2" => Some(Self::Tier2),
            "taux3" => Some(Self::Tier3),
            _ => None,
        }
    }

    /// Deserialize an optional tier tag. Missing, null, empty or unknown tags
    /// all become `None`.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying deserializer fails.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(tag.as_ref().and_then(serde_json::Value::as_str).and_then(Self::from_tag))
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
