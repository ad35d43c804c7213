use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Category, ClothingItem, Formality, Occasion, OutfitCandidate, ScheduleEvent, Season,
        WeatherSnapshot,
    },
};

/// Request context rendered into the generation prompt
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub date: NaiveDate,
    pub season: Season,
    pub weather: &'a WeatherSnapshot,
    pub events: &'a [ScheduleEvent],
    pub occasion: Occasion,
    pub required_formality: Formality,
    pub max_outfits: usize,
}

/// Renders the structured prompt sent to the generative model
pub fn build_prompt(ctx: &PromptContext<'_>, items: &[&ClothingItem]) -> String {
    let mut lines = vec![
        format!(
            "You are a personal stylist. Suggest up to {} outfits for {} ({}).",
            ctx.max_outfits.max(1),
            ctx.date,
            ctx.season
        ),
        weather_line(ctx.weather),
        format!(
            "Occasion: {} (formality {} of {}).",
            ctx.occasion,
            ctx.required_formality,
            Formality::MAX
        ),
    ];

    if ctx.events.is_empty() {
        lines.push("Schedule: nothing planned.".to_string());
    } else {
        lines.push("Schedule:".to_string());
        for event in ctx.events {
            lines.push(format!(
                "- {}-{} {} ({})",
                event.start.format("%H:%M"),
                event.end.format("%H:%M"),
                event.title,
                event.occasion
            ));
        }
    }

    lines.push("Wardrobe (use only these ids):".to_string());
    for item in items {
        lines.push(item_line(item));
    }

    lines.push(
        "Use at most one item per category. A one_piece replaces both top and bottom.".to_string(),
    );
    lines.push(
        r#"Respond with JSON only: {"outfits":[{"item_ids":["<id>"],"reason":"<short reason>","confidence":0.0}]}"#
            .to_string(),
    );

    lines.join("\n")
}

fn weather_line(weather: &WeatherSnapshot) -> String {
    if weather.is_known() {
        format!(
            "Weather: {:.1}°C, {}, humidity {}%.",
            weather.temperature_c, weather.condition, weather.humidity_pct
        )
    } else {
        "Weather: unknown.".to_string()
    }
}

fn item_line(item: &ClothingItem) -> String {
    let mut fields = vec![
        item.id.to_string(),
        item.category.to_string(),
        item.label(),
        format!("formality {}", item.formality),
    ];

    let colors: Vec<&str> = [&item.primary_color, &item.secondary_color]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if !colors.is_empty() {
        fields.push(format!("colors: {}", colors.join("/")));
    }
    if let Some(material) = &item.material {
        fields.push(format!("material: {}", material));
    }
    if !item.seasons.is_empty() {
        let seasons: Vec<String> = item.seasons.iter().map(Season::to_string).collect();
        fields.push(format!("seasons: {}", seasons.join(",")));
    }
    if !item.styles.is_empty() {
        let styles: Vec<&str> = item.styles.iter().map(String::as_str).collect();
        fields.push(format!("styles: {}", styles.join(",")));
    }

    format!("- {}", fields.join(" | "))
}

#[derive(Debug, Deserialize)]
struct GeneratedResponse {
    #[serde(default)]
    outfits: Vec<GeneratedOutfit>,
}

#[derive(Debug, Deserialize)]
struct GeneratedOutfit {
    #[serde(default)]
    item_ids: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Turns a model response into candidates drawn from `items`
///
/// The JSON object may be wrapped in code fences or prose. Unknown ids and
/// second items for an occupied slot are dropped with a warning; outfits left
/// without a top, bottom or one-piece are discarded. Returns `Parse` when no
/// usable outfit remains.
pub fn parse_generated(response: &str, items: &[&ClothingItem]) -> AppResult<Vec<OutfitCandidate>> {
    let json = extract_json(response)
        .ok_or_else(|| AppError::Parse("no JSON object in response".to_string()))?;
    let parsed: GeneratedResponse =
        serde_json::from_str(json).map_err(|e| AppError::Parse(e.to_string()))?;

    let by_id: HashMap<Uuid, &ClothingItem> = items.iter().map(|item| (item.id, *item)).collect();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (index, outfit) in parsed.outfits.into_iter().enumerate() {
        let mut chosen: Vec<ClothingItem> = Vec::new();

        for raw_id in &outfit.item_ids {
            let item = match Uuid::parse_str(raw_id.trim())
                .ok()
                .and_then(|id| by_id.get(&id))
            {
                Some(item) => *item,
                None => {
                    tracing::warn!(outfit = index, item_id = %raw_id, "Generated outfit references unknown item");
                    continue;
                }
            };

            if conflicts(&chosen, item.category) {
                tracing::warn!(
                    outfit = index,
                    item_id = %item.id,
                    slot = %item.category,
                    "Dropping item for an occupied slot"
                );
                continue;
            }
            chosen.push(item.clone());
        }

        let has_core = chosen.iter().any(|item| {
            matches!(
                item.category,
                Category::Top | Category::Bottom | Category::OnePiece
            )
        });
        if !has_core {
            tracing::warn!(outfit = index, "Dropping generated outfit without a top, bottom or one-piece");
            continue;
        }

        let mut candidate = match OutfitCandidate::new(chosen) {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!(outfit = index, error = %e, "Dropping invalid generated outfit");
                continue;
            }
        };

        if !seen.insert(candidate.signature()) {
            continue;
        }

        candidate.rationale = outfit.reason.filter(|reason| !reason.trim().is_empty());
        candidate.confidence = outfit
            .confidence
            .filter(|confidence| confidence.is_finite())
            .map(|confidence| confidence.clamp(0.0, 1.0));
        candidates.push(candidate);
    }

    if candidates.is_empty() {
        return Err(AppError::Parse("response contained no usable outfits".to_string()));
    }

    Ok(candidates)
}

/// Whether adding an item of `category` would break the one-item-per-slot rule
fn conflicts(chosen: &[ClothingItem], category: Category) -> bool {
    chosen.iter().any(|existing| {
        existing.category == category
            || (category == Category::OnePiece
                && matches!(existing.category, Category::Top | Category::Bottom))
            || (existing.category == Category::OnePiece
                && matches!(category, Category::Top | Category::Bottom))
    })
}

/// Outermost `{...}` span of the response
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherCondition;
    use chrono::NaiveDateTime;

    fn item(category: Category, level: u8, name: &str) -> ClothingItem {
        ClothingItem::new(category, Formality::new(level).unwrap())
            .named(name)
            .in_all_seasons()
    }

    fn wardrobe() -> Vec<ClothingItem> {
        vec![
            item(Category::Top, 3, "white shirt"),
            item(Category::Bottom, 2, "jeans"),
            item(Category::Shoes, 3, "black shoes"),
            item(Category::OnePiece, 3, "dress"),
        ]
    }

    fn refs(items: &[ClothingItem]) -> Vec<&ClothingItem> {
        items.iter().collect()
    }

    #[test]
    fn test_build_prompt_lists_context_and_ids() {
        let items = wardrobe();
        let date = NaiveDate::from_ymd_opt(2024, 10, 15).unwrap();
        let weather = WeatherSnapshot::new(date, 10.0, WeatherCondition::Rain);
        let events = vec![ScheduleEvent {
            title: "Quarterly review".to_string(),
            start: NaiveDateTime::parse_from_str("2024-10-15 09:00", "%Y-%m-%d %H:%M").unwrap(),
            end: NaiveDateTime::parse_from_str("2024-10-15 10:00", "%Y-%m-%d %H:%M").unwrap(),
            occasion: Occasion::Business,
        }];
        let ctx = PromptContext {
            date,
            season: Season::Autumn,
            weather: &weather,
            events: &events,
            occasion: Occasion::Business,
            required_formality: Formality::new(4).unwrap(),
            max_outfits: 3,
        };

        let prompt = build_prompt(&ctx, &refs(&items));

        assert!(prompt.contains("2024-10-15 (autumn)"));
        assert!(prompt.contains("10.0°C, rain"));
        assert!(prompt.contains("09:00-10:00 Quarterly review"));
        assert!(prompt.contains("formality 4 of 5"));
        for item in &items {
            assert!(prompt.contains(&item.id.to_string()));
        }
        assert!(prompt.contains(r#""item_ids""#));
    }

    #[test]
    fn test_build_prompt_unknown_weather() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 15).unwrap();
        let weather = WeatherSnapshot::unknown(date);
        let ctx = PromptContext {
            date,
            season: Season::Autumn,
            weather: &weather,
            events: &[],
            occasion: Occasion::Casual,
            required_formality: Formality::MIN,
            max_outfits: 3,
        };

        let prompt = build_prompt(&ctx, &[]);
        assert!(prompt.contains("Weather: unknown."));
        assert!(prompt.contains("nothing planned"));
    }

    #[test]
    fn test_parse_fenced_response() {
        let items = wardrobe();
        let response = format!(
            "Here you go:\n```json\n{{\"outfits\":[{{\"item_ids\":[\"{}\",\"{}\"],\"reason\":\"clean\",\"confidence\":0.8}}]}}\n```",
            items[0].id, items[1].id
        );

        let candidates = parse_generated(&response, &refs(&items)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].len(), 2);
        assert_eq!(candidates[0].rationale.as_deref(), Some("clean"));
        assert_eq!(candidates[0].confidence, Some(0.8));
    }

    #[test]
    fn test_parse_drops_unknown_ids() {
        let items = wardrobe();
        let response = format!(
            r#"{{"outfits":[{{"item_ids":["{}","{}","not-an-id"]}}]}}"#,
            items[0].id,
            Uuid::new_v4()
        );

        let candidates = parse_generated(&response, &refs(&items)).unwrap();
        assert_eq!(candidates[0].item_ids(), vec![items[0].id]);
    }

    #[test]
    fn test_parse_drops_conflicting_slots() {
        let items = wardrobe();
        let response = format!(
            r#"{{"outfits":[{{"item_ids":["{}","{}","{}"]}}]}}"#,
            items[3].id, items[0].id, items[2].id
        );

        let candidates = parse_generated(&response, &refs(&items)).unwrap();
        let ids = candidates[0].item_ids();
        assert!(ids.contains(&items[3].id));
        assert!(!ids.contains(&items[0].id));
        assert!(ids.contains(&items[2].id));
    }

    #[test]
    fn test_parse_clamps_confidence() {
        let items = wardrobe();
        let response = format!(
            r#"{{"outfits":[{{"item_ids":["{}"],"confidence":7}}]}}"#,
            items[3].id
        );

        let candidates = parse_generated(&response, &refs(&items)).unwrap();
        assert_eq!(candidates[0].confidence, Some(1.0));
    }

    #[test]
    fn test_parse_without_core_piece_is_error() {
        let items = wardrobe();
        let response = format!(r#"{{"outfits":[{{"item_ids":["{}"]}}]}}"#, items[2].id);

        let result = parse_generated(&response, &refs(&items));
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_parse_malformed_response() {
        let items = wardrobe();
        assert!(matches!(
            parse_generated("I cannot help with that.", &refs(&items)),
            Err(AppError::Parse(_))
        ));
        assert!(matches!(
            parse_generated("{\"outfits\": [", &refs(&items)),
            Err(AppError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_deduplicates_outfits() {
        let items = wardrobe();
        let response = format!(
            r#"{{"outfits":[{{"item_ids":["{a}","{b}"]}},{{"item_ids":["{b}","{a}"]}}]}}"#,
            a = items[0].id,
            b = items[1].id
        );

        let candidates = parse_generated(&response, &refs(&items)).unwrap();
        assert_eq!(candidates.len(), 1);
    }
}
