//! Merchandise categories.
//!
//! The backend stores a product's category in its `role` field using the
//! lowercase French names below. Each category also decides which
//! specification keys the product form offers.

use serde::{Deserialize, Deserializer, Serialize};

/// A specification field offered by the product form for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecField {
    /// Key in the product's `specs` map.
    pub key: &'static str,
    /// Form label.
    pub label: &'static str,
}

const fn field(key: &'static str, label: &'static str) -> SpecField {
    SpecField { key, label }
}

const COMPUTER_FIELDS: &[SpecField] = &[
    field("cpu", "Processeur"),
    field("cputype", "Type de processeur"),
    field("ram", "Mémoire RAM"),
    field("stockage", "Stockage"),
    field("gpu", "Carte graphique"),
    field("screen", "Taille écran"),
    field("network", "Réseau"),
    field("burner", "Graveur"),
    field("connections", "Connectique"),
    field("alim", "Alimentation"),
    field("os", "Système d'exploitation"),
];

const SCREEN_FIELDS: &[SpecField] = &[
    field("displaysize", "Taille écran"),
    field("connections", "Connectique"),
    field("medicalCE", "CE Médical"),
    field("support", "Support"),
    field("captor", "Capteur"),
    field("cord", "Cordon Inclus"),
    field("resolution", "Résolution"),
    field("contrast", "Contraste"),
];

const NETWORK_FIELDS: &[SpecField] = &[
    field("racks", "Nombre de baies"),
    field("poe", "PoE"),
    field("poePower", "Puissance PoE"),
    field("alim", "Alimentation"),
];

const CABLE_FIELDS: &[SpecField] = &[field("cable", "Câble")];

const EXTRA_DESCRIPTION_FIELDS: &[SpecField] =
    &[field("description3", "Description complémentaire")];

const PRINTER_FIELDS: &[SpecField] = &[
    field("rectoverso", "Impression recto-verso"),
    field("charger", "Chargeur"),
    field("norm", "Norme"),
    field("cable", "Câble"),
    field("optionbac", "Option bac"),
    field("alim", "Alimentation"),
];

const POWER_FIELDS: &[SpecField] = &[field("alim", "Alimentation")];

/// Merchandise category of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ordinateurs")]
    Computers,
    #[serde(rename = "écrans")]
    Screens,
    #[serde(rename = "réseaux - nas")]
    NetworkStorage,
    #[serde(rename = "accessoires")]
    Accessories,
    #[serde(rename = "robot epson")]
    EpsonRobots,
    #[serde(rename = "onduleurs")]
    Ups,
    #[serde(rename = "imprimantes & scanners")]
    PrintersScanners,
    #[serde(rename = "câbles")]
    Cables,
    #[serde(rename = "téléphone ip")]
    IpPhones,
    #[serde(rename = "occasions")]
    Refurbished,
    #[serde(rename = "logiciels")]
    Software,
}

impl Category {
    /// All categories, in catalogue order.
    pub const ALL: [Self; 11] = [
        Self::Computers,
        Self::Screens,
        Self::NetworkStorage,
        Self::Accessories,
        Self::EpsonRobots,
        Self::Ups,
        Self::PrintersScanners,
        Self::Cables,
        Self::IpPhones,
        Self::Refurbished,
        Self::Software,
    ];

    /// Wire value stored in the product's `role` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Computers => "ordinateurs",
            Self::Screens => "écrans",
            Self::NetworkStorage => "réseaux - nas",
            Self::Accessories => "accessoires",
            Self::EpsonRobots => "robot epson",
            Self::Ups => "onduleurs",
            Self::PrintersScanners => "imprimantes & scanners",
            Self::Cables => "câbles",
            Self::IpPhones => "téléphone ip",
            Self::Refurbished => "occasions",
            Self::Software => "logiciels",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Computers => "Ordinateurs",
            Self::Screens => "Écrans",
            Self::NetworkStorage => "Réseaux - Nas",
            Self::Accessories => "Accessoires",
            Self::EpsonRobots => "Robot Epson",
            Self::Ups => "Onduleurs",
            Self::PrintersScanners => "Imprimantes & Scanners",
            Self::Cables => "Câbles",
            Self::IpPhones => "Téléphone IP",
            Self::Refurbished => "Occasions",
            Self::Software => "Logiciels",
        }
    }

    /// ASCII path segment used in storefront URLs.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Computers => "ordinateurs",
            Self::Screens => "ecrans",
            Self::NetworkStorage => "reseaux-nas",
            Self::Accessories => "accessoires",
            Self::EpsonRobots => "robot-epson",
            Self::Ups => "onduleurs",
            Self::PrintersScanners => "imprimantes-scanners",
            Self::Cables => "cables",
            Self::IpPhones => "telephone-ip",
            Self::Refurbished => "occasions",
            Self::Software => "logiciels",
        }
    }

    /// Specification fields meaningful for this category.
    #[must_use]
    pub const fn spec_fields(self) -> &'static [SpecField] {
        match self {
            Self::Computers => COMPUTER_FIELDS,
            Self::Screens => SCREEN_FIELDS,
            Self::NetworkStorage => NETWORK_FIELDS,
            Self::Accessories | Self::EpsonRobots => CABLE_FIELDS,
            Self::Ups | Self::Refurbished => EXTRA_DESCRIPTION_FIELDS,
            Self::PrintersScanners => PRINTER_FIELDS,
            Self::IpPhones => POWER_FIELDS,
            Self::Cables | Self::Software => &[],
        }
    }

    /// Look a category up by its wire value, display name or slug,
    /// ignoring case.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let needle = input.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| {
            c.as_str() == needle || c.slug() == needle || c.label().to_lowercase() == needle
        })
    }

    /// Deserialize an optional category, mapping unknown values to `None`.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying deserializer fails.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(Self::parse))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_all_spellings() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
            assert_eq!(Category::parse(category.slug()), Some(category));
            assert_eq!(Category::parse(category.label()), Some(category));
        }
        assert_eq!(Category::parse("Réseaux - NAS"), Some(Category::NetworkStorage));
        assert_eq!(Category::parse("catalogues clients"), None);
    }

    #[test]
    fn test_wire_value_matches_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn test_spec_fields_per_category() {
        let keys: Vec<_> = Category::PrintersScanners
            .spec_fields()
            .iter()
            .map(|f| f.key)
            .collect();
        assert_eq!(
            keys,
            ["rectoverso", "charger", "norm", "cable", "optionbac", "alim"]
        );
        assert_eq!(Category::Accessories.spec_fields(), Category::EpsonRobots.spec_fields());
        assert!(Category::Software.spec_fields().is_empty());
    }
}
