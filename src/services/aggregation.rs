use crate::models::{Cuisine, CuisineScore, TasteProfile, DEFAULT_PREFERENCE, DEFAULT_WEIGHT};

use super::scoring::{cuisine_score, lookup_preference, lookup_weight, round2};

/// Number of cuisines returned by [`top_cuisines`]
pub const TOP_CUISINES: usize = 6;

/// A group's (preference, weight) pair for one cuisine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub preference: f64,
    pub weight: f64,
}

impl Aggregate {
    pub fn cuisine_score(&self) -> f64 {
        cuisine_score(self.preference, self.weight)
    }
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            preference: DEFAULT_PREFERENCE,
            weight: DEFAULT_WEIGHT,
        }
    }
}

/// How member profiles are reduced to a single group view
pub trait AggregationPolicy: Send + Sync {
    /// One (preference, weight) pair for `cuisine`
    fn aggregate(&self, profiles: &[TasteProfile], cuisine: Cuisine) -> Aggregate;

    /// Group-level cuisine score used to rank cuisines
    fn cuisine_score(&self, profiles: &[TasteProfile], cuisine: Cuisine) -> f64;
}

/// Unweighted arithmetic mean over members
///
/// Every member counts the same regardless of role or history. An empty group
/// yields the system defaults (preference 3, weight 1.0).
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAggregation;

impl AggregationPolicy for MeanAggregation {
    fn aggregate(&self, profiles: &[TasteProfile], cuisine: Cuisine) -> Aggregate {
        if profiles.is_empty() {
            return Aggregate::default();
        }

        let count = profiles.len() as f64;
        let (preference_sum, weight_sum) = profiles.iter().fold((0.0, 0.0), |(p, w), profile| {
            (
                p + lookup_preference(profile, cuisine),
                w + lookup_weight(profile, cuisine),
            )
        });

        Aggregate {
            preference: preference_sum / count,
            weight: weight_sum / count,
        }
    }

    /// Mean of each member's own preference × weight
    fn cuisine_score(&self, profiles: &[TasteProfile], cuisine: Cuisine) -> f64 {
        if profiles.is_empty() {
            return Aggregate::default().cuisine_score();
        }

        let total: f64 = profiles
            .iter()
            .map(|profile| {
                cuisine_score(
                    lookup_preference(profile, cuisine),
                    lookup_weight(profile, cuisine),
                )
            })
            .sum();
        total / profiles.len() as f64
    }
}

/// Ranks the whole taxonomy by `score` and keeps the best [`TOP_CUISINES`]
///
/// Scores are rounded before sorting; ties keep taxonomy order.
pub fn top_cuisines<F>(score: F) -> Vec<CuisineScore>
where
    F: Fn(Cuisine) -> f64,
{
    let mut scores: Vec<CuisineScore> = Cuisine::ALL
        .into_iter()
        .map(|cuisine| CuisineScore {
            cuisine,
            score: round2(score(cuisine)),
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores.truncate(TOP_CUISINES);
    scores
}

/// Top cuisines for a single user
pub fn personal_top_cuisines(profile: &TasteProfile) -> Vec<CuisineScore> {
    top_cuisines(|cuisine| {
        cuisine_score(
            lookup_preference(profile, cuisine),
            lookup_weight(profile, cuisine),
        )
    })
}

/// Top cuisines for a group under `policy`
pub fn group_top_cuisines(
    policy: &dyn AggregationPolicy,
    profiles: &[TasteProfile],
) -> Vec<CuisineScore> {
    top_cuisines(|cuisine| policy.cuisine_score(profiles, cuisine))
}
