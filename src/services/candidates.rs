use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{
        Category, ClothingItem, Formality, GenerationMode, OutfitCandidate, SkippedSlot,
    },
    services::{
        prompt::{self, PromptContext},
        providers::GenerativeProvider,
        tables::MAX_FORMALITY_SPREAD,
    },
};

/// Days after which an item counts as fully rested for the pre-filter
const FRESHNESS_HORIZON_DAYS: i64 = 30;

/// Optional slots filled after the base, in enumeration order
const OPTIONAL_SLOTS: [Category; 3] = [Category::Outerwear, Category::Shoes, Category::Accessory];

/// Eligible items grouped by slot, after the lookback filter and pre-filter
#[derive(Debug, Clone)]
pub struct SlotPools {
    pools: BTreeMap<Category, Vec<ClothingItem>>,
    skipped: Vec<SkippedSlot>,
}

impl SlotPools {
    /// Filters the wardrobe for `date` and keeps at most `per_slot_limit` items per slot
    ///
    /// Items worn fewer than `lookback_days` days before `date` are left out
    /// (0 disables the filter). Oversized slots keep the most rested, least worn
    /// items, ties going to the item closest to `required`.
    pub fn build(
        wardrobe: &[ClothingItem],
        date: NaiveDate,
        lookback_days: u32,
        required: Formality,
        per_slot_limit: usize,
    ) -> Self {
        let mut pools: BTreeMap<Category, Vec<ClothingItem>> = BTreeMap::new();
        let mut owned: BTreeMap<Category, usize> = BTreeMap::new();

        for item in wardrobe {
            *owned.entry(item.category).or_default() += 1;
            if is_eligible(item, date, lookback_days) {
                pools.entry(item.category).or_default().push(item.clone());
            }
        }

        let limit = per_slot_limit.max(1);
        for (slot, pool) in pools.iter_mut() {
            if pool.len() > limit {
                let before = pool.len();
                prefilter(pool, date, required, limit);
                tracing::debug!(slot = %slot, before, after = pool.len(), "Pre-filtered slot");
            }
        }

        let skipped = [Category::Top, Category::Bottom]
            .into_iter()
            .filter(|slot| pools.get(slot).map_or(true, Vec::is_empty))
            .map(|slot| {
                let reason = match owned.get(&slot).copied().unwrap_or(0) {
                    0 => format!("no {} items in the wardrobe", slot),
                    n => format!(
                        "all {} {} items were worn within the last {} days",
                        n, slot, lookback_days
                    ),
                };
                SkippedSlot { slot, reason }
            })
            .collect();

        Self { pools, skipped }
    }

    pub fn pool(&self, slot: Category) -> &[ClothingItem] {
        self.pools.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Required slots with no eligible items
    pub fn skipped(&self) -> &[SkippedSlot] {
        &self.skipped
    }

    /// At least one of top, bottom or one-piece has an eligible item
    pub fn is_feasible(&self) -> bool {
        [Category::Top, Category::Bottom, Category::OnePiece]
            .into_iter()
            .any(|slot| !self.pool(slot).is_empty())
    }

    /// Every eligible item, in slot order
    pub fn items(&self) -> Vec<&ClothingItem> {
        self.pools.values().flatten().collect()
    }
}

fn is_eligible(item: &ClothingItem, date: NaiveDate, lookback_days: u32) -> bool {
    match item.days_since_worn(date) {
        Some(days) => days >= i64::from(lookback_days),
        None => true,
    }
}

/// Freshness weighted against wear frequency; higher is better
fn rotation_score(item: &ClothingItem, date: NaiveDate) -> f64 {
    let freshness = match item.days_since_worn(date) {
        Some(days) => days.min(FRESHNESS_HORIZON_DAYS) as f64 / FRESHNESS_HORIZON_DAYS as f64,
        None => 1.0,
    };
    freshness / (1.0 + f64::from(item.wear_count))
}

fn prefilter(pool: &mut Vec<ClothingItem>, date: NaiveDate, required: Formality, limit: usize) {
    pool.sort_by(|a, b| {
        rotation_score(b, date)
            .total_cmp(&rotation_score(a, date))
            .then_with(|| a.formality.distance(required).cmp(&b.formality.distance(required)))
    });
    pool.truncate(limit);
}

fn within_spread<'a>(items: impl IntoIterator<Item = &'a ClothingItem>) -> bool {
    let mut levels = items.into_iter().map(|item| item.formality.level());
    let Some(first) = levels.next() else {
        return true;
    };
    let (min, max) = levels.fold((first, first), |(lo, hi), level| (lo.min(level), hi.max(level)));
    max - min <= MAX_FORMALITY_SPREAD
}

/// Enumerates formality-consistent combinations slot by slot
///
/// Bases are every (top or none) x (bottom or none) pairing followed by each
/// one-piece; optional slots are then tried item first, empty last. Partial
/// combinations whose formality spread exceeds the limit are pruned. A top or
/// bottom may be left out only when none of its eligible items would fit.
/// Results are deduplicated, ordered by how close their most formal piece is
/// to `required` (fuller outfits first on a tie) and truncated to `cap`.
pub fn enumerate(pools: &SlotPools, required: Formality, cap: usize) -> Vec<OutfitCandidate> {
    let mut found: Vec<Vec<&ClothingItem>> = Vec::new();

    let tops: Vec<Option<&ClothingItem>> = with_none(pools.pool(Category::Top));
    let bottoms: Vec<Option<&ClothingItem>> = with_none(pools.pool(Category::Bottom));

    let mut bases: Vec<Vec<&ClothingItem>> = Vec::new();
    for top in &tops {
        for bottom in &bottoms {
            let base: Vec<&ClothingItem> = top.iter().chain(bottom.iter()).copied().collect();
            if !base.is_empty() {
                bases.push(base);
            }
        }
    }
    bases.extend(pools.pool(Category::OnePiece).iter().map(|item| vec![item]));

    for base in bases {
        if within_spread(base.iter().copied()) {
            extend(pools, base, 0, &mut found);
        }
    }

    let mut seen = HashSet::new();
    let mut candidates: Vec<OutfitCandidate> = found
        .into_iter()
        .filter_map(|items| OutfitCandidate::new(items.into_iter().cloned().collect()).ok())
        .filter(|candidate| seen.insert(candidate.signature()))
        .collect();

    candidates.sort_by_key(|candidate| {
        let delta = candidate
            .max_formality()
            .map_or(u8::MAX, |max| max.distance(required));
        (delta, Reverse(candidate.len()))
    });
    candidates.truncate(cap);
    candidates
}

fn with_none(pool: &[ClothingItem]) -> Vec<Option<&ClothingItem>> {
    pool.iter().map(Some).chain(std::iter::once(None)).collect()
}

fn extend<'a>(
    pools: &'a SlotPools,
    chosen: Vec<&'a ClothingItem>,
    depth: usize,
    found: &mut Vec<Vec<&'a ClothingItem>>,
) {
    let Some(slot) = OPTIONAL_SLOTS.get(depth).copied() else {
        if leaves_nothing_out(pools, &chosen) {
            found.push(chosen);
        }
        return;
    };

    for item in pools.pool(slot) {
        let mut next = chosen.clone();
        next.push(item);
        if within_spread(next.iter().copied()) {
            extend(pools, next, depth + 1, found);
        }
    }
    extend(pools, chosen, depth + 1, found);
}

/// A missing top or bottom is acceptable only when no eligible item would fit
fn leaves_nothing_out(pools: &SlotPools, chosen: &[&ClothingItem]) -> bool {
    if chosen.iter().any(|item| item.category == Category::OnePiece) {
        return true;
    }

    [Category::Top, Category::Bottom].into_iter().all(|slot| {
        chosen.iter().any(|item| item.category == slot)
            || pools.pool(slot).iter().all(|candidate| {
                !within_spread(chosen.iter().copied().chain(std::iter::once(candidate)))
            })
    })
}

/// Generative call budget
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub timeout: Duration,
    /// Extra attempts after a timeout or provider error; never more than one
    pub retries: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 0,
        }
    }
}

/// Candidates for one request and the mode that actually produced them
#[derive(Debug, Clone)]
pub struct GeneratedCandidates {
    pub candidates: Vec<OutfitCandidate>,
    pub produced_by: GenerationMode,
    pub fallback_reason: Option<String>,
}

/// Produces candidates in the requested mode
///
/// Generative mode asks the model once (plus at most one retry) and uses its
/// outfits only if at least one survives parsing. Any failure switches the
/// whole request to deterministic enumeration; the two sources are never mixed.
pub async fn generate_candidates(
    pools: &SlotPools,
    ctx: &PromptContext<'_>,
    mode: GenerationMode,
    generator: Option<&dyn GenerativeProvider>,
    settings: &GenerationSettings,
    cap: usize,
) -> GeneratedCandidates {
    let fallback_reason = match (mode, generator) {
        (GenerationMode::Deterministic, _) => None,
        (GenerationMode::Generative, None) => Some("no generative provider configured".to_string()),
        (GenerationMode::Generative, Some(generator)) => {
            match generate_with_model(pools, ctx, generator, settings).await {
                Ok(mut candidates) => {
                    candidates.truncate(cap);
                    tracing::debug!(
                        provider = generator.name(),
                        candidates = candidates.len(),
                        "Using generated candidates"
                    );
                    return GeneratedCandidates {
                        candidates,
                        produced_by: GenerationMode::Generative,
                        fallback_reason: None,
                    };
                }
                Err(e) => Some(e.to_string()),
            }
        }
    };

    if let Some(reason) = &fallback_reason {
        tracing::warn!(reason = %reason, "Falling back to deterministic candidates");
    }

    GeneratedCandidates {
        candidates: enumerate(pools, ctx.required_formality, cap),
        produced_by: GenerationMode::Deterministic,
        fallback_reason,
    }
}

async fn generate_with_model(
    pools: &SlotPools,
    ctx: &PromptContext<'_>,
    generator: &dyn GenerativeProvider,
    settings: &GenerationSettings,
) -> AppResult<Vec<OutfitCandidate>> {
    let items = pools.items();
    let prompt = prompt::build_prompt(ctx, &items);
    let attempts = settings.retries.min(1) + 1;

    let mut last_error = AppError::Internal("generation was not attempted".to_string());
    for attempt in 1..=attempts {
        let response = tokio::time::timeout(settings.timeout, generator.generate(&prompt))
            .await
            .map_err(|_| AppError::timeout(generator.name(), settings.timeout))
            .and_then(|result| result);

        match response {
            Ok(text) => return prompt::parse_generated(&text, &items),
            Err(e) => {
                tracing::warn!(
                    provider = generator.name(),
                    attempt,
                    error = %e,
                    "Generation attempt failed"
                );
                last_error = e;
            }
        }
    }

    Err(last_error)
}
