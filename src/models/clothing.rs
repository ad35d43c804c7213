use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, fmt::Display};
use uuid::Uuid;

/// Clothing category, which is also the outfit slot an item occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Top,
    Bottom,
    /// Dresses, jumpsuits and similar pieces that fill both the top and bottom slots
    OnePiece,
    Outerwear,
    Shoes,
    Accessory,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Top,
        Category::Bottom,
        Category::OnePiece,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessory,
    ];

    /// Top and bottom must be filled (or covered by a one-piece) for a complete outfit
    pub fn is_required(&self) -> bool {
        matches!(self, Category::Top | Category::Bottom)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::OnePiece => "one_piece",
            Category::Outerwear => "outerwear",
            Category::Shoes => "shoes",
            Category::Accessory => "accessory",
        };
        write!(f, "{}", label)
    }
}

/// Dress-code weight from 1 (very casual) to 5 (black tie)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Formality(u8);

impl Formality {
    pub const MIN: Formality = Formality(1);
    pub const MAX: Formality = Formality(5);

    pub fn new(level: u8) -> Result<Self, String> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(format!("formality level must be between 1 and 5, got {}", level))
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Absolute distance between two levels
    pub fn distance(&self, other: Formality) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl TryFrom<u8> for Formality {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Formality::new(level)
    }
}

impl From<Formality> for u8 {
    fn from(formality: Formality) -> Self {
        formality.0
    }
}

impl Display for Formality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];
}

impl Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        };
        write!(f, "{}", label)
    }
}

/// A catalogued garment as supplied by the wardrobe repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClothingItem {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub formality: Formality,
    #[serde(default)]
    pub seasons: BTreeSet<Season>,
    /// Lowercased, trimmed style labels
    #[serde(default, deserialize_with = "deserialize_styles")]
    pub styles: BTreeSet<String>,
    #[serde(default)]
    pub wear_count: u32,
    #[serde(default)]
    pub last_worn: Option<NaiveDate>,
    /// Image embedding, only used for similarity lookups outside the engine
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl ClothingItem {
    /// Creates an untagged, never-worn item
    pub fn new(category: Category, formality: Formality) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            category,
            primary_color: None,
            secondary_color: None,
            material: None,
            pattern: None,
            formality,
            seasons: BTreeSet::new(),
            styles: BTreeSet::new(),
            wear_count: 0,
            last_worn: None,
            embedding: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.primary_color = Some(color.to_string());
        self
    }

    pub fn with_material(mut self, material: &str) -> Self {
        self.material = Some(material.to_string());
        self
    }

    pub fn with_seasons(mut self, seasons: &[Season]) -> Self {
        self.seasons = seasons.iter().copied().collect();
        self
    }

    pub fn in_all_seasons(self) -> Self {
        self.with_seasons(&Season::ALL)
    }

    pub fn with_styles(mut self, styles: &[&str]) -> Self {
        self.styles = styles.iter().filter_map(|s| normalize_style(s)).collect();
        self
    }

    pub fn worn(mut self, wear_count: u32, last_worn: Option<NaiveDate>) -> Self {
        self.wear_count = wear_count;
        self.last_worn = last_worn;
        self
    }

    /// Whole days between the last wear and `on`; `None` if never worn.
    /// A last-worn date after `on` counts as worn that same day.
    pub fn days_since_worn(&self, on: NaiveDate) -> Option<i64> {
        self.last_worn
            .map(|worn| (on - worn).num_days().max(0))
    }

    /// Human-readable label for logs and prompts
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => match &self.primary_color {
                Some(color) => format!("{} {}", color, self.category),
                None => self.category.to_string(),
            },
        }
    }
}

/// Canonical form of a free-form style tag; `None` for a blank tag
pub fn normalize_style(style: &str) -> Option<String> {
    let style = style.trim();
    (!style.is_empty()).then(|| style.to_lowercase())
}

fn deserialize_styles<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|style| normalize_style(style)).collect())
}
