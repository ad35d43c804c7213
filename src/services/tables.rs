use chrono::{Datelike, NaiveDate};
use std::collections::{HashMap, HashSet};

use crate::models::{Category, Formality, Occasion, Season};

/// Largest allowed gap between the most and least formal pieces of one outfit
pub const MAX_FORMALITY_SPREAD: u8 = 1;

/// Score for pairings that involve a neutral or unrecognised color
pub const NEUTRAL_SCORE: f64 = 0.5;

const SEASON_BY_MONTH: [Season; 12] = [
    Season::Winter, // Jan
    Season::Winter,
    Season::Spring,
    Season::Spring,
    Season::Spring,
    Season::Summer,
    Season::Summer,
    Season::Summer,
    Season::Autumn,
    Season::Autumn,
    Season::Autumn,
    Season::Winter, // Dec
];

const OCCASION_FORMALITY: &[(Occasion, u8)] = &[
    (Occasion::Casual, 1),
    (Occasion::Sport, 1),
    (Occasion::SmartCasual, 3),
    (Occasion::Business, 4),
    (Occasion::Formal, 5),
];

const NEUTRAL_COLORS: &[&str] = &["black", "white", "grey"];

const COLOR_ALIASES: &[(&str, &str)] = &[
    ("gray", "grey"),
    ("charcoal", "grey"),
    ("ivory", "white"),
    ("off-white", "white"),
    ("dark blue", "navy"),
    ("denim", "blue"),
    ("light blue", "blue"),
    ("khaki", "beige"),
    ("camel", "beige"),
    ("tan", "brown"),
    ("violet", "purple"),
    ("burgundy", "red"),
    ("olive", "green"),
];

/// Analogous and complementary pairings; read symmetrically
const COLOR_PAIRS: &[(&str, &str)] = &[
    ("red", "orange"),
    ("red", "pink"),
    ("red", "purple"),
    ("red", "green"),
    ("orange", "yellow"),
    ("orange", "blue"),
    ("orange", "brown"),
    ("yellow", "green"),
    ("yellow", "purple"),
    ("green", "blue"),
    ("blue", "purple"),
    ("blue", "navy"),
    ("purple", "pink"),
    ("navy", "beige"),
    ("navy", "brown"),
    ("brown", "beige"),
    ("beige", "green"),
];

const HEAVY_MATERIALS: &[&str] = &[
    "wool",
    "cashmere",
    "fleece",
    "down",
    "leather",
    "tweed",
    "corduroy",
];

/// An entry of the essential-items checklist
#[derive(Debug, Clone, PartialEq)]
pub struct Essential {
    pub label: String,
    pub category: Category,
    pub season: Season,
}

const ESSENTIALS: &[(&str, Category, Season)] = &[
    ("light layer top", Category::Top, Season::Spring),
    ("spring bottoms", Category::Bottom, Season::Spring),
    ("light jacket", Category::Outerwear, Season::Spring),
    ("spring shoes", Category::Shoes, Season::Spring),
    ("short-sleeve top", Category::Top, Season::Summer),
    ("lightweight bottoms", Category::Bottom, Season::Summer),
    ("summer shoes", Category::Shoes, Season::Summer),
    ("long-sleeve top", Category::Top, Season::Autumn),
    ("autumn bottoms", Category::Bottom, Season::Autumn),
    ("jacket", Category::Outerwear, Season::Autumn),
    ("autumn shoes", Category::Shoes, Season::Autumn),
    ("sweater", Category::Top, Season::Winter),
    ("heavy bottoms", Category::Bottom, Season::Winter),
    ("heavy coat", Category::Outerwear, Season::Winter),
    ("winter shoes", Category::Shoes, Season::Winter),
];

const SEASONAL_SUGGESTIONS: &[(Season, &[&str])] = &[
    (Season::Spring, &["light outerwear", "long-sleeve shirt"]),
    (Season::Summer, &["t-shirt", "short-sleeve shirt", "lightweight bottoms"]),
    (Season::Autumn, &["knitwear", "long-sleeve shirt", "jacket"]),
    (Season::Winter, &["heavy coat", "sweater", "heavy bottoms"]),
];

/// Lookup data the rules read from
///
/// Built from the static tables above by `Default`; swap or extend entries here
/// rather than in the scoring functions.
#[derive(Debug, Clone)]
pub struct RuleTables {
    pub season_by_month: [Season; 12],
    pub occasion_formality: HashMap<Occasion, Formality>,
    pub neutral_colors: HashSet<String>,
    pub color_aliases: HashMap<String, String>,
    pub color_pairs: HashSet<(String, String)>,
    pub heavy_materials: HashSet<String>,
    pub essentials: Vec<Essential>,
    pub seasonal_suggestions: HashMap<Season, Vec<String>>,
}

impl Default for RuleTables {
    fn default() -> Self {
        let occasion_formality = OCCASION_FORMALITY
            .iter()
            .filter_map(|(occasion, level)| {
                Formality::new(*level).ok().map(|formality| (*occasion, formality))
            })
            .collect();

        let mut color_pairs = HashSet::new();
        for (a, b) in COLOR_PAIRS {
            color_pairs.insert((a.to_string(), b.to_string()));
            color_pairs.insert((b.to_string(), a.to_string()));
        }

        Self {
            season_by_month: SEASON_BY_MONTH,
            occasion_formality,
            neutral_colors: NEUTRAL_COLORS.iter().map(|c| c.to_string()).collect(),
            color_aliases: COLOR_ALIASES
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect(),
            color_pairs,
            heavy_materials: HEAVY_MATERIALS.iter().map(|m| m.to_string()).collect(),
            essentials: ESSENTIALS
                .iter()
                .map(|(label, category, season)| Essential {
                    label: label.to_string(),
                    category: *category,
                    season: *season,
                })
                .collect(),
            seasonal_suggestions: SEASONAL_SUGGESTIONS
                .iter()
                .map(|(season, items)| (*season, items.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

impl RuleTables {
    pub fn season_for(&self, date: NaiveDate) -> Season {
        self.season_by_month[date.month0() as usize]
    }

    /// Formality the occasion calls for; occasions missing from the table are treated as casual
    pub fn required_formality(&self, occasion: Occasion) -> Formality {
        self.occasion_formality
            .get(&occasion)
            .copied()
            .unwrap_or(Formality::MIN)
    }

    /// Lowercased, trimmed, alias-resolved color name
    pub fn canonical_color(&self, color: &str) -> String {
        let normalized = color.trim().to_lowercase();
        self.color_aliases
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    pub fn is_neutral(&self, color: &str) -> bool {
        self.neutral_colors.contains(color)
    }

    /// Whether the color appears anywhere in the pairing table
    pub fn is_known_color(&self, color: &str) -> bool {
        self.color_pairs.iter().any(|(a, _)| a == color)
    }

    pub fn colors_pair(&self, a: &str, b: &str) -> bool {
        self.color_pairs.contains(&(a.to_string(), b.to_string()))
    }

    pub fn is_heavy(&self, material: &str) -> bool {
        let material = material.trim().to_lowercase();
        self.heavy_materials
            .iter()
            .any(|heavy| material.contains(heavy.as_str()))
    }

    pub fn suggestions_for(&self, season: Season) -> Vec<String> {
        self.seasonal_suggestions
            .get(&season)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_for_month() {
        let tables = RuleTables::default();
        let date = |m| NaiveDate::from_ymd_opt(2024, m, 10).unwrap();
        assert_eq!(tables.season_for(date(1)), Season::Winter);
        assert_eq!(tables.season_for(date(4)), Season::Spring);
        assert_eq!(tables.season_for(date(7)), Season::Summer);
        assert_eq!(tables.season_for(date(10)), Season::Autumn);
        assert_eq!(tables.season_for(date(12)), Season::Winter);
    }

    #[test]
    fn test_required_formality() {
        let tables = RuleTables::default();
        assert_eq!(tables.required_formality(Occasion::Casual).level(), 1);
        assert_eq!(tables.required_formality(Occasion::Business).level(), 4);
        assert_eq!(tables.required_formality(Occasion::Formal).level(), 5);
    }

    #[test]
    fn test_missing_occasion_defaults_to_casual() {
        let mut tables = RuleTables::default();
        tables.occasion_formality.remove(&Occasion::SmartCasual);
        assert_eq!(tables.required_formality(Occasion::SmartCasual), Formality::MIN);
    }

    #[test]
    fn test_color_aliases_and_pairs() {
        let tables = RuleTables::default();
        assert_eq!(tables.canonical_color(" Gray "), "grey");
        assert!(tables.is_neutral(&tables.canonical_color("GRAY")));
        assert!(tables.colors_pair("navy", "blue"));
        assert!(tables.colors_pair("blue", "navy"));
        assert!(!tables.colors_pair("red", "yellow"));
    }

    #[test]
    fn test_heavy_material_matching() {
        let tables = RuleTables::default();
        assert!(tables.is_heavy("Merino Wool"));
        assert!(tables.is_heavy("leather"));
        assert!(!tables.is_heavy("linen"));
    }
}
