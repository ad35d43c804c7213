use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{
    Category, ClothingItem, Formality, Occasion, OutfitCandidate, Rule, Season, WeatherAdvice,
    WeatherCondition, WeatherSnapshot,
};
use crate::services::tables::{RuleTables, NEUTRAL_SCORE};

/// Deducted from weather suitability for each problem found
pub const WEATHER_PENALTY: f64 = 0.3;
/// Below this temperature an outer layer is expected
pub const COLD_THRESHOLD_C: f64 = 15.0;
/// Above this temperature heavy fabrics are penalized
pub const HOT_THRESHOLD_C: f64 = 25.0;

/// Everything the rules need to know about the day
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub tables: &'a RuleTables,
    pub weather: &'a WeatherSnapshot,
    pub occasion: Occasion,
    pub date: NaiveDate,
}

impl RuleContext<'_> {
    pub fn season(&self) -> Season {
        self.tables.season_for(self.date)
    }

    pub fn required_formality(&self) -> Formality {
        self.tables.required_formality(self.occasion)
    }
}

/// Runs every applicable rule against a candidate
///
/// Weather suitability is left out of the map when the weather is unknown.
pub fn evaluate(candidate: &OutfitCandidate, ctx: &RuleContext<'_>) -> BTreeMap<Rule, f64> {
    let items: Vec<&ClothingItem> = candidate.items().collect();

    let mut scores = BTreeMap::new();
    scores.insert(Rule::ColorHarmony, color_harmony(&items, ctx.tables));
    scores.insert(Rule::SeasonalFit, seasonal_fit(&items, ctx.season()));
    scores.insert(
        Rule::FormalityMatch,
        formality_match(&items, ctx.required_formality()),
    );
    if let Some(score) = weather_suitability(&items, ctx.weather, ctx.tables) {
        scores.insert(Rule::WeatherSuitability, score);
    }
    scores
}

/// Mean pairing score across all primary-color pairs
///
/// Matching or adjacent colors score 1.0, any pair touching a neutral or
/// unrecognised color scores 0.5, everything else clashes at 0.0.
pub fn color_harmony(items: &[&ClothingItem], tables: &RuleTables) -> f64 {
    if items.len() < 2 {
        return NEUTRAL_SCORE;
    }

    let mut total = 0.0;
    let mut pairs = 0;
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            total += pair_score(
                a.primary_color.as_deref(),
                b.primary_color.as_deref(),
                tables,
            );
            pairs += 1;
        }
    }

    total / pairs as f64
}

fn pair_score(a: Option<&str>, b: Option<&str>, tables: &RuleTables) -> f64 {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (tables.canonical_color(a), tables.canonical_color(b)),
        _ => return NEUTRAL_SCORE,
    };

    if tables.is_neutral(&a) || tables.is_neutral(&b) {
        return NEUTRAL_SCORE;
    }
    if !tables.is_known_color(&a) || !tables.is_known_color(&b) {
        return NEUTRAL_SCORE;
    }

    if a == b || tables.colors_pair(&a, &b) {
        1.0
    } else {
        0.0
    }
}

/// Share of items tagged for the given season
pub fn seasonal_fit(items: &[&ClothingItem], season: Season) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let matches = items
        .iter()
        .filter(|item| item.seasons.contains(&season))
        .count();
    matches as f64 / items.len() as f64
}

/// 1.0 when the most formal piece matches the occasion, decaying by a quarter per level
pub fn formality_match(items: &[&ClothingItem], required: Formality) -> f64 {
    let Some(max) = items.iter().map(|item| item.formality).max() else {
        return 0.0;
    };
    let delta = f64::from(max.distance(required));
    (1.0 - delta / 4.0).max(0.0)
}

/// Penalizes a missing outer layer in cold or wet weather and heavy fabrics in heat
///
/// Returns `None` when the weather is unknown so the rule can be skipped.
pub fn weather_suitability(
    items: &[&ClothingItem],
    weather: &WeatherSnapshot,
    tables: &RuleTables,
) -> Option<f64> {
    if !weather.is_known() {
        return None;
    }

    let mut penalty = 0.0;

    let needs_cover = weather.temperature_c < COLD_THRESHOLD_C || weather.condition.is_wet();
    let has_outerwear = items
        .iter()
        .any(|item| item.category == Category::Outerwear);
    if needs_cover && !has_outerwear {
        penalty += WEATHER_PENALTY;
    }

    if weather.temperature_c > HOT_THRESHOLD_C {
        let heavy = items
            .iter()
            .filter(|item| item.material.as_deref().is_some_and(|m| tables.is_heavy(m)))
            .count();
        penalty += WEATHER_PENALTY * heavy as f64;
    }

    Some((1.0 - penalty).max(0.0))
}

/// What to wear given the weather alone
pub fn weather_advice(weather: &WeatherSnapshot) -> WeatherAdvice {
    if !weather.is_known() {
        return WeatherAdvice {
            needs_outerwear: false,
            needs_rainwear: false,
            suggested_materials: Vec::new(),
            suggested_style: "weather unavailable".to_string(),
        };
    }

    let temp = weather.temperature_c;
    let (materials, style): (&[&str], &str) = if temp < 10.0 {
        (&["wool", "fleece"], "heavy outerwear")
    } else if temp < COLD_THRESHOLD_C {
        (&["cotton", "polyester"], "jacket or cardigan")
    } else if temp < HOT_THRESHOLD_C {
        (&["cotton"], "long sleeves")
    } else {
        (&["linen", "light cotton"], "short sleeves, light layers")
    };

    WeatherAdvice {
        needs_outerwear: temp < COLD_THRESHOLD_C || weather.condition.is_wet(),
        needs_rainwear: weather.condition == WeatherCondition::Rain,
        suggested_materials: materials.iter().map(|m| m.to_string()).collect(),
        suggested_style: style.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
    }

    fn item(category: Category, level: u8, color: &str) -> ClothingItem {
        ClothingItem::new(category, Formality::new(level).unwrap()).with_color(color)
    }

    #[test]
    fn test_color_harmony_adjacent_colors() {
        let tables = RuleTables::default();
        let top = item(Category::Top, 2, "navy");
        let bottom = item(Category::Bottom, 2, "blue");
        assert_eq!(color_harmony(&[&top, &bottom], &tables), 1.0);
    }

    #[test]
    fn test_color_harmony_neutral_pair() {
        let tables = RuleTables::default();
        let top = item(Category::Top, 2, "white");
        let bottom = item(Category::Bottom, 2, "red");
        assert_eq!(color_harmony(&[&top, &bottom], &tables), 0.5);
    }

    #[test]
    fn test_color_harmony_clash() {
        let tables = RuleTables::default();
        let top = item(Category::Top, 2, "red");
        let bottom = item(Category::Bottom, 2, "yellow");
        assert_eq!(color_harmony(&[&top, &bottom], &tables), 0.0);
    }

    #[test]
    fn test_color_harmony_undefined_color_is_neutral() {
        let tables = RuleTables::default();
        let top = item(Category::Top, 2, "chartreuse");
        let bottom = ClothingItem::new(Category::Bottom, Formality::MIN);
        let shoes = item(Category::Shoes, 2, "red");
        assert_eq!(color_harmony(&[&top, &bottom, &shoes], &tables), 0.5);
    }

    #[test]
    fn test_color_harmony_averages_pairs() {
        let tables = RuleTables::default();
        let top = item(Category::Top, 2, "red");
        let bottom = item(Category::Bottom, 2, "orange");
        let shoes = item(Category::Shoes, 2, "blue");
        // red-orange 1.0, red-blue 0.0, orange-blue 1.0
        let score = color_harmony(&[&top, &bottom, &shoes], &tables);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_seasonal_fit_proportional() {
        let summer_only = item(Category::Top, 2, "white").with_seasons(&[Season::Summer]);
        let all = item(Category::Bottom, 2, "blue").in_all_seasons();
        assert_eq!(seasonal_fit(&[&summer_only, &all], Season::Autumn), 0.5);
        assert_eq!(seasonal_fit(&[&summer_only, &all], Season::Summer), 1.0);
    }

    #[test]
    fn test_formality_match_exact_and_decay() {
        let blazer = item(Category::Outerwear, 4, "navy");
        let shirt = item(Category::Top, 3, "white");
        let business = Formality::new(4).unwrap();
        let casual = Formality::new(1).unwrap();

        assert_eq!(formality_match(&[&blazer, &shirt], business), 1.0);
        assert_eq!(formality_match(&[&blazer, &shirt], casual), 0.25);
        assert_eq!(formality_match(&[&shirt], business), 0.75);
    }

    #[test]
    fn test_formality_match_floor() {
        let gown = item(Category::OnePiece, 5, "black");
        assert_eq!(formality_match(&[&gown], Formality::MIN), 0.0);
    }

    #[test]
    fn test_weather_missing_outerwear_when_cold() {
        let tables = RuleTables::default();
        let weather = WeatherSnapshot::new(date(), 10.0, WeatherCondition::Clear);
        let shirt = item(Category::Top, 3, "white");
        let coat = item(Category::Outerwear, 3, "beige");

        let without = weather_suitability(&[&shirt], &weather, &tables).unwrap();
        let with = weather_suitability(&[&shirt, &coat], &weather, &tables).unwrap();
        assert!((without - 0.7).abs() < 1e-9);
        assert_eq!(with, 1.0);
    }

    #[test]
    fn test_weather_rain_requires_outerwear() {
        let tables = RuleTables::default();
        let weather = WeatherSnapshot::new(date(), 20.0, WeatherCondition::Rain);
        let shirt = item(Category::Top, 3, "white");
        let score = weather_suitability(&[&shirt], &weather, &tables).unwrap();
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_weather_heavy_fabrics_in_heat() {
        let tables = RuleTables::default();
        let weather = WeatherSnapshot::new(date(), 30.0, WeatherCondition::Clear);
        let sweater = item(Category::Top, 2, "grey").with_material("wool");
        let cords = item(Category::Bottom, 2, "brown").with_material("corduroy");
        let boots = item(Category::Shoes, 2, "brown").with_material("leather");
        let linen = item(Category::Top, 2, "white").with_material("linen");
        let parka = item(Category::Outerwear, 2, "green").with_material("down");

        assert_eq!(weather_suitability(&[&linen], &weather, &tables), Some(1.0));
        let score = weather_suitability(&[&sweater, &cords], &weather, &tables).unwrap();
        assert!((score - 0.4).abs() < 1e-9);
        assert_eq!(
            weather_suitability(&[&sweater, &cords, &boots, &parka, &linen], &weather, &tables),
            Some(0.0)
        );
    }

    #[test]
    fn test_weather_unknown_is_skipped() {
        let tables = RuleTables::default();
        let weather = WeatherSnapshot::unknown(date());
        let shirt = item(Category::Top, 3, "white");
        assert_eq!(weather_suitability(&[&shirt], &weather, &tables), None);

        let candidate = OutfitCandidate::new(vec![shirt]).unwrap();
        let ctx = RuleContext {
            tables: &tables,
            weather: &weather,
            occasion: Occasion::Casual,
            date: date(),
        };
        let scores = evaluate(&candidate, &ctx);
        assert!(!scores.contains_key(&Rule::WeatherSuitability));
        assert_eq!(scores.len(), 3);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let tables = RuleTables::default();
        let weather = WeatherSnapshot::new(date(), 10.0, WeatherCondition::Clear);
        let candidate = OutfitCandidate::new(vec![
            item(Category::Top, 3, "white").in_all_seasons(),
            item(Category::Bottom, 2, "blue").in_all_seasons(),
        ])
        .unwrap();
        let ctx = RuleContext {
            tables: &tables,
            weather: &weather,
            occasion: Occasion::Business,
            date: date(),
        };

        assert_eq!(evaluate(&candidate, &ctx), evaluate(&candidate, &ctx));
        assert!(evaluate(&candidate, &ctx)
            .values()
            .all(|score| (0.0..=1.0).contains(score)));
    }

    #[test]
    fn test_weather_advice_bands() {
        let cold = weather_advice(&WeatherSnapshot::new(date(), 5.0, WeatherCondition::Clear));
        assert!(cold.needs_outerwear);
        assert!(cold.suggested_materials.contains(&"wool".to_string()));

        let hot = weather_advice(&WeatherSnapshot::new(date(), 30.0, WeatherCondition::Clear));
        assert!(!hot.needs_outerwear);
        assert!(hot.suggested_style.contains("short sleeves"));

        let rain = weather_advice(&WeatherSnapshot::new(date(), 20.0, WeatherCondition::Rain));
        assert!(rain.needs_rainwear);
        assert!(rain.needs_outerwear);
    }
}
