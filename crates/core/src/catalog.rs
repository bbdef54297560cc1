//! Category filters and specification labels.
//!
//! Each category may declare filters over a product attribute or a
//! specification key. A product is kept when, for every filter with at least
//! one ticked option, one of those options matches.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Category, Product};

/// How a filter is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Checkbox,
    Select,
}

/// Where the filtered value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// A product attribute (`type`, `brand`, ...).
    Product,
    /// A key of the product's specifications.
    Specs,
}

/// How an option is compared with the product's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub label: &'static str,
    pub kind: FilterKind,
    pub options: &'static [&'static str],
    pub field: &'static str,
    pub source: FilterSource,
    pub match_type: MatchType,
}

const fn checkbox(
    label: &'static str,
    field: &'static str,
    source: FilterSource,
    options: &'static [&'static str],
) -> FilterConfig {
    FilterConfig {
        label,
        kind: FilterKind::Checkbox,
        options,
        field,
        source,
        match_type: MatchType::Exact,
    }
}

const NETWORK_FILTERS: &[FilterConfig] = &[
    checkbox(
        "Type",
        "type",
        FilterSource::Product,
        &[
            "Routeur PFSENSE",
            "Borne WIFI",
            "SWITCH",
            "NAS",
            "KIT RAIL NAS",
            "HDD NAS RACK",
            "RESEAUX NAS RACK",
        ],
    ),
    checkbox(
        "Nombre de baies/ports",
        "racks",
        FilterSource::Specs,
        &["6 ou moins", "8", "16", "24", "48"],
    ),
];

const ACCESSORY_FILTERS: &[FilterConfig] = &[
    checkbox(
        "Type",
        "type",
        FilterSource::Product,
        &[
            "Enregistreur Numerique",
            "Accessoire Enregistreur Numerique",
            "Lecteur de carte Vital",
            "cartes de nettoyage",
            "Douchette",
            "SOURIS USB FILAIRE",
            "SOURIS USB SANS FIL",
            "CLAVIR USB FILAIRE",
            "PACK CLAVIER& SOURIS SANS FIL",
            "IMPRIMANTE THERMIQUE D' ETIQUETTE",
            "HUB USB",
            "ANTIVOL LENOVO",
            "STATION d'accueil",
            "CHARGEUR",
            "Sacoche",
            "SO DIMM DDR5",
            "SERVICE",
            "WEBCAM",
            "SUPPORT UC + ECRAN",
            "LECTEUR DVD EXTERNE",
            "PDU",
        ],
    ),
    checkbox(
        "Type de connectique",
        "cable",
        FilterSource::Specs,
        &[
            "USB Type A",
            "USB Type A-B",
            "USB-C vers USB-A",
            "RECEPTEUR USB-A",
            "RECEPTEUR USB-A BLUETOOTH",
            "USB Type A et C",
            "Adaptateur secteur 65W",
            "Adaptateur secteur 90W",
        ],
    ),
];

const SCREEN_FILTERS: &[FilterConfig] = &[
    checkbox(
        "Marque",
        "brand",
        FilterSource::Product,
        &["DELL", "ACER", "ASUS", "LG"],
    ),
    checkbox(
        "Taille d'écran",
        "displaysize",
        FilterSource::Specs,
        &["21P", "22P", "24P", "27P", "31P", "32P", "55P"],
    ),
];

const COMPUTER_FILTERS: &[FilterConfig] = &[
    checkbox(
        "Marque",
        "brand",
        FilterSource::Product,
        &["DELL", "LENOVO", "ASUS", "MSI"],
    ),
    FilterConfig {
        match_type: MatchType::Contains,
        ..checkbox(
            "Type",
            "type",
            FilterSource::Product,
            &["WORKSTATION", "PC PORTABLE", "ALL IN ONE", "UC Bureautique"],
        )
    },
    checkbox(
        "Processeur",
        "cpu",
        FilterSource::Specs,
        &[
            "Intel Core i5",
            "Intel Core i7",
            "Intel Core i9",
            "Intel Core Ultra 7",
            "Intel Xeon 2423",
        ],
    ),
    checkbox(
        "Mémoire RAM",
        "ram",
        FilterSource::Specs,
        &[
            "8 Go Sodimm DDR4",
            "16 Go Sodimm DDR4",
            "16 Go Sodimm DDR5",
            "16 Go (1 x 16 Go) DDR5",
            "32 Go (2 x 16 Go) DDR5",
            "32 Go soudée Sodimm DDR5",
        ],
    ),
];

/// Filters offered on a category page.
#[must_use]
pub const fn filters_for(category: Category) -> &'static [FilterConfig] {
    match category {
        Category::NetworkStorage => NETWORK_FILTERS,
        Category::Accessories => ACCESSORY_FILTERS,
        Category::Screens => SCREEN_FILTERS,
        Category::Computers => COMPUTER_FILTERS,
        _ => &[],
    }
}

/// Lowercase and collapse runs of whitespace.
fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl FilterConfig {
    fn value_of<'a>(&self, product: &'a Product) -> Option<&'a str> {
        match self.source {
            FilterSource::Specs => product.specs.get(self.field),
            FilterSource::Product => match self.field {
                "type" => Some(product.kind.as_str()),
                "brand" => Some(product.brand.as_str()),
                "model" => Some(product.model.as_str()),
                "name" => Some(product.name.as_str()),
                "sku" => Some(product.sku.as_str()),
                _ => None,
            },
        }
    }

    /// Whether `product` matches one of `selected`.
    #[must_use]
    pub fn matches(&self, product: &Product, selected: &BTreeSet<String>) -> bool {
        let Some(value) = self.value_of(product).map(normalize) else {
            return false;
        };
        selected.iter().map(|o| normalize(o)).any(|option| match self.match_type {
            MatchType::Exact => value == option,
            MatchType::Contains => value.contains(&option),
        })
    }
}

/// Ticked options, keyed by filter label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilters(BTreeMap<String, BTreeSet<String>>);

impl ActiveFilters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(label, option)` pairs, such as a query string, keeping
    /// only labels and options the category declares.
    pub fn from_pairs<'a, I>(category: Category, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let filters = filters_for(category);
        let mut active = Self::new();
        for (label, option) in pairs {
            let known = filters
                .iter()
                .any(|f| f.label == label && f.options.contains(&option));
            if known {
                active
                    .0
                    .entry(label.to_owned())
                    .or_default()
                    .insert(option.to_owned());
            }
        }
        active
    }

    /// Tick an option, or untick it if already ticked.
    pub fn toggle(&mut self, label: &str, option: &str) {
        let options = self.0.entry(label.to_owned()).or_default();
        if !options.remove(option) {
            options.insert(option.to_owned());
        }
        if options.is_empty() {
            self.0.remove(label);
        }
    }

    #[must_use]
    pub fn is_selected(&self, label: &str, option: &str) -> bool {
        self.0.get(label).is_some_and(|o| o.contains(option))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn selected(&self, label: &str) -> Option<&BTreeSet<String>> {
        self.0.get(label)
    }

    /// `(label, option)` pairs, e.g. to rebuild a query string.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(label, options)| options.iter().map(move |o| (label.as_str(), o.as_str())))
    }
}

/// Keep the products matching every active filter.
#[must_use]
pub fn apply<'a>(
    products: &'a [Product],
    filters: &[FilterConfig],
    active: &ActiveFilters,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| {
            filters.iter().all(|filter| {
                active
                    .selected(filter.label)
                    .is_none_or(|selected| filter.matches(product, selected))
            })
        })
        .collect()
}

/// French label of a specification key. Keys with a suffix (`alim_ordi`) fall
/// back to their base key; unknown keys are shown as-is.
#[must_use]
pub fn spec_label(key: &str) -> &str {
    let base = key.split('_').next().unwrap_or(key);
    known_label(key).or_else(|| known_label(base)).unwrap_or(key)
}

fn known_label(key: &str) -> Option<&'static str> {
    Some(match key {
        "cpu" => "Processeur",
        "cputype" => "Type de processeur",
        "ram" => "Mémoire RAM",
        "stockage" => "Stockage",
        "gpu" => "Carte graphique",
        "screen" => "Écran",
        "network" => "Réseau",
        "burner" => "Lecteur optique",
        "connections" => "Connectiques",
        "os" => "Système d'exploitation",
        "displaysize" => "Taille d'écran",
        "medicalCE" => "Certification médicale CE",
        "support" => "Support",
        "captor" => "Capteur",
        "cord" => "Câble d'alimentation",
        "resolution" => "Résolution",
        "contrast" => "Contraste",
        "racks" => "Nombre de baies",
        "poe" => "Alimentation PoE",
        "poePower" => "Puissance PoE",
        "alim" => "Alimentation",
        "cable" => "Câble",
        "description3" => "Description détaillée",
        "rectoverso" => "Recto-verso",
        "charger" => "Chargeur",
        "norm" => "Norme",
        "optionbac" => "Option bac papier",
        _ => return None,
    })
}
