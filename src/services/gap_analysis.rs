use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    models::{
        normalize_style, Category, ClothingItem, Coverage, EssentialCheck, GapReport,
        GapSuggestion, Priority, Season,
    },
    services::tables::{RuleTables, MAX_FORMALITY_SPREAD},
};

/// Coverage ratio below which a style or season gets a suggestion
const LOW_COVERAGE: f64 = 0.3;

const MIN_TOPS: usize = 3;
const MIN_BOTTOMS: usize = 2;
const MIN_OUTERWEAR: usize = 1;

/// Distinct categories needed for the full category share of the wardrobe score
const FULL_CATEGORY_BREADTH: usize = 3;
/// Distinct primary colors needed for the full color share of the wardrobe score
const FULL_COLOR_VARIETY: usize = 8;
const MIN_COLOR_VARIETY: usize = 4;

const CORE_STYLES: [&str; 4] = ["casual", "formal", "business", "sport"];

/// Expected minimum number of tagged items per style and season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapThresholds {
    pub style_min_count: u32,
    pub season_min_count: u32,
    /// Styles always reported, even when nothing is tagged with them
    pub core_styles: Vec<String>,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            style_min_count: 5,
            season_min_count: 5,
            core_styles: CORE_STYLES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Builds the gap report for a wardrobe
///
/// Read-only: the wardrobe is never modified and no collaborator is consulted.
pub fn analyze(
    wardrobe: &[ClothingItem],
    tables: &RuleTables,
    thresholds: &GapThresholds,
) -> GapReport {
    let essentials = check_essentials(wardrobe, tables);
    let style_coverage = style_coverage(wardrobe, thresholds);
    let season_coverage = season_coverage(wardrobe, thresholds);
    let category_distribution = category_distribution(wardrobe);
    let color_distribution = color_distribution(wardrobe, tables);

    let tops = count(&category_distribution, Category::Top);
    let bottoms = count(&category_distribution, Category::Bottom);
    let one_pieces = count(&category_distribution, Category::OnePiece);
    let outerwear = count(&category_distribution, Category::Outerwear);

    let possible_pairings = tops * bottoms;
    let compatible_pairings = compatible_pairings(wardrobe);
    let combination_score = if possible_pairings == 0 {
        0.0
    } else {
        (compatible_pairings as f64 / possible_pairings as f64).clamp(0.0, 1.0)
    };
    let outfit_combinations = (tops * bottoms + one_pieces) * (outerwear + 1);

    let wardrobe_score = wardrobe_score(
        &category_distribution,
        &style_coverage,
        &season_coverage,
        color_distribution.len(),
    );

    let suggestions = suggestions(
        &category_distribution,
        &style_coverage,
        &season_coverage,
        color_distribution.len(),
        tables,
    );

    tracing::debug!(
        items = wardrobe.len(),
        missing_essentials = essentials.iter().filter(|e| !e.satisfied).count(),
        wardrobe_score,
        "Analyzed wardrobe gaps"
    );

    GapReport {
        total_items: wardrobe.len(),
        essentials,
        style_coverage,
        season_coverage,
        combination_score,
        compatible_pairings,
        possible_pairings,
        outfit_combinations,
        category_distribution,
        color_distribution,
        wardrobe_score,
        suggestions,
    }
}

fn count(distribution: &BTreeMap<Category, usize>, category: Category) -> usize {
    distribution.get(&category).copied().unwrap_or(0)
}

fn check_essentials(wardrobe: &[ClothingItem], tables: &RuleTables) -> Vec<EssentialCheck> {
    tables
        .essentials
        .iter()
        .map(|essential| {
            let owned = wardrobe
                .iter()
                .filter(|item| {
                    item.category == essential.category && item.seasons.contains(&essential.season)
                })
                .count();
            let satisfied = owned > 0;
            let deficiency = (!satisfied).then(|| {
                format!(
                    "no {} item tagged for {} ({})",
                    essential.category, essential.season, essential.label
                )
            });

            EssentialCheck {
                label: essential.label.clone(),
                category: essential.category,
                season: essential.season,
                owned,
                satisfied,
                deficiency,
            }
        })
        .collect()
}

fn style_coverage(
    wardrobe: &[ClothingItem],
    thresholds: &GapThresholds,
) -> BTreeMap<String, Coverage> {
    let tags: Vec<BTreeSet<String>> = wardrobe
        .iter()
        .map(|item| item.styles.iter().filter_map(|s| normalize_style(s)).collect())
        .collect();

    let mut styles: BTreeSet<String> = thresholds
        .core_styles
        .iter()
        .filter_map(|style| normalize_style(style))
        .collect();
    styles.extend(tags.iter().flatten().cloned());

    styles
        .into_iter()
        .map(|style| {
            let tagged = tags.iter().filter(|item| item.contains(&style)).count();
            let coverage = Coverage::new(tagged, thresholds.style_min_count);
            (style, coverage)
        })
        .collect()
}

fn season_coverage(
    wardrobe: &[ClothingItem],
    thresholds: &GapThresholds,
) -> BTreeMap<Season, Coverage> {
    Season::ALL
        .into_iter()
        .map(|season| {
            let tagged = wardrobe
                .iter()
                .filter(|item| item.seasons.contains(&season))
                .count();
            (season, Coverage::new(tagged, thresholds.season_min_count))
        })
        .collect()
}

fn category_distribution(wardrobe: &[ClothingItem]) -> BTreeMap<Category, usize> {
    let mut distribution = BTreeMap::new();
    for item in wardrobe {
        *distribution.entry(item.category).or_insert(0) += 1;
    }
    distribution
}

fn color_distribution(wardrobe: &[ClothingItem], tables: &RuleTables) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for color in wardrobe.iter().filter_map(|item| item.primary_color.as_deref()) {
        let color = tables.canonical_color(color);
        if !color.is_empty() {
            *distribution.entry(color).or_insert(0) += 1;
        }
    }
    distribution
}

/// (top, bottom) pairs whose formality levels are close enough to be worn together
fn compatible_pairings(wardrobe: &[ClothingItem]) -> usize {
    let tops = wardrobe.iter().filter(|item| item.category == Category::Top);
    tops.map(|top| {
        wardrobe
            .iter()
            .filter(|item| item.category == Category::Bottom)
            .filter(|bottom| top.formality.distance(bottom.formality) <= MAX_FORMALITY_SPREAD)
            .count()
    })
    .sum()
}

/// Overall fullness from 0 to 100, a quarter each for category breadth, style
/// coverage, season coverage and color variety
fn wardrobe_score(
    categories: &BTreeMap<Category, usize>,
    styles: &BTreeMap<String, Coverage>,
    seasons: &BTreeMap<Season, Coverage>,
    color_variety: usize,
) -> f64 {
    let breadth = (categories.len() as f64 / FULL_CATEGORY_BREADTH as f64).min(1.0);
    let variety = (color_variety as f64 / FULL_COLOR_VARIETY as f64).min(1.0);

    let score = 25.0 * breadth
        + 25.0 * mean_ratio(styles.values())
        + 25.0 * mean_ratio(seasons.values())
        + 25.0 * variety;

    (score * 10.0).round() / 10.0
}

fn mean_ratio<'a>(coverage: impl ExactSizeIterator<Item = &'a Coverage>) -> f64 {
    let n = coverage.len();
    if n == 0 {
        return 0.0;
    }
    coverage.map(|c| c.ratio).sum::<f64>() / n as f64
}

fn suggestions(
    categories: &BTreeMap<Category, usize>,
    styles: &BTreeMap<String, Coverage>,
    seasons: &BTreeMap<Season, Coverage>,
    color_variety: usize,
    tables: &RuleTables,
) -> Vec<GapSuggestion> {
    let mut suggestions = Vec::new();
    let owned = |category| count(categories, category);

    if owned(Category::Top) < MIN_TOPS {
        suggestions.push(GapSuggestion {
            item: "tops".to_string(),
            reason: "too few basic tops".to_string(),
            priority: Priority::High,
            suggested: vec!["white shirt".into(), "t-shirt".into(), "knitwear".into()],
        });
    }

    if owned(Category::Bottom) < MIN_BOTTOMS {
        suggestions.push(GapSuggestion {
            item: "bottoms".to_string(),
            reason: "little variety in bottoms".to_string(),
            priority: Priority::High,
            suggested: vec!["denim".into(), "slacks".into()],
        });
    }

    if owned(Category::Outerwear) < MIN_OUTERWEAR {
        suggestions.push(GapSuggestion {
            item: "outerwear".to_string(),
            reason: "no outerwear".to_string(),
            priority: Priority::Medium,
            suggested: vec!["jacket".into(), "cardigan".into()],
        });
    }

    for (style, coverage) in styles {
        if coverage.ratio < LOW_COVERAGE {
            suggestions.push(GapSuggestion {
                item: format!("{} pieces", style),
                reason: format!("few items suited to a {} look", style),
                priority: Priority::Medium,
                suggested: vec![format!("items styled for {}", style)],
            });
        }
    }

    for (season, coverage) in seasons {
        if coverage.ratio < LOW_COVERAGE {
            suggestions.push(GapSuggestion {
                item: format!("{} pieces", season),
                reason: format!("few items for {}", season),
                priority: Priority::Medium,
                suggested: tables.suggestions_for(*season),
            });
        }
    }

    if color_variety < MIN_COLOR_VARIETY {
        suggestions.push(GapSuggestion {
            item: "color variety".to_string(),
            reason: format!("only {} distinct colors", color_variety),
            priority: Priority::Low,
            suggested: vec!["pieces beyond the basic colors".into()],
        });
    }

    suggestions
}
