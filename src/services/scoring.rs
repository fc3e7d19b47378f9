use crate::models::{Cuisine, TasteProfile};

/// Share of the external popularity rating in the combined score
pub const EXTERNAL_SHARE: f64 = 0.3;

/// Share of the cuisine score in the combined score
pub const CUISINE_SHARE: f64 = 0.7;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

/// Human-readable form of [`compute_personal_score`]
pub const FORMULA: &str = "External Rating × 0.3 + (Manual Preference × Weight) × 0.7";

/// preference × weight
pub fn cuisine_score(preference: f64, weight: f64) -> f64 {
    preference * weight
}

/// Blends a manual preference, a learned weight and an external rating into one score
///
/// `clamp(external × 0.3 + preference × weight × 0.7, 1, 5)`. Inputs are not
/// sanitized here; stores keep preferences and weights sane.
pub fn compute_personal_score(preference: f64, weight: f64, external_rating: f64) -> f64 {
    blend(cuisine_score(preference, weight), external_rating)
}

/// Combines an already computed cuisine score with an external rating
pub fn blend(cuisine_score: f64, external_rating: f64) -> f64 {
    let raw = external_rating * EXTERNAL_SHARE + cuisine_score * CUISINE_SHARE;
    raw.clamp(MIN_SCORE, MAX_SCORE)
}

pub fn lookup_preference(profile: &TasteProfile, cuisine: Cuisine) -> f64 {
    profile.preference(cuisine)
}

pub fn lookup_weight(profile: &TasteProfile, cuisine: Cuisine) -> f64 {
    profile.weight(cuisine)
}

/// Rounds to 2 decimals, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
