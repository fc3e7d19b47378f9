use crate::models::{Cuisine, Place, Recommendation, TasteProfile};

use super::aggregation::AggregationPolicy;
use super::scoring::{compute_personal_score, cuisine_score, lookup_preference, lookup_weight, round2};

/// Number of recommendations returned when no valid limit is given
pub const DEFAULT_LIMIT: usize = 4;

/// Parses a client-supplied limit; anything but a positive integer yields [`DEFAULT_LIMIT`]
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
        .map(|limit| limit as usize)
        .unwrap_or(DEFAULT_LIMIT)
}

/// Whose taste a ranking reflects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Personal,
    Group,
}

/// The (preference, weight) pair every candidate is scored against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBasis {
    pub preference: f64,
    pub weight: f64,
    pub audience: Audience,
}

impl ScoreBasis {
    fn reasoning(&self, cuisine: Cuisine, external_rating: f64) -> String {
        match self.audience {
            Audience::Personal => format!(
                "Your {} preference ({:.1}/5) × weight ({:.2}) + restaurant rating ({:.1}/5)",
                cuisine, self.preference, self.weight, external_rating
            ),
            Audience::Group => format!(
                "Group {} preference ({:.1}/5 avg) × weight ({:.2} avg) + restaurant rating ({:.1}/5)",
                cuisine, self.preference, self.weight, external_rating
            ),
        }
    }
}

/// Ranked candidates plus how many were looked at and left out
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub recommendations: Vec<Recommendation>,
    pub considered: usize,
    pub excluded: usize,
}

/// Scores and orders candidates for one cuisine
///
/// 1. Malformed candidates are excluded and counted, not fatal
/// 2. Every remaining candidate is scored against the same basis
/// 3. Sorted by combined score, descending; equal scores keep search order
/// 4. Truncated to `limit` (0 means [`DEFAULT_LIMIT`])
pub fn rank(cuisine: Cuisine, basis: ScoreBasis, candidates: Vec<Place>, limit: usize) -> Ranking {
    let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
    let considered = candidates.len();
    let reported_cuisine_score = round2(cuisine_score(basis.preference, basis.weight));

    let mut excluded = 0;
    let mut recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .filter_map(|place| {
            if let Err(reason) = place.validate() {
                tracing::warn!(
                    place_id = %place.place_id,
                    reason = %reason,
                    "Excluding malformed candidate from ranking"
                );
                excluded += 1;
                return None;
            }

            let external_rating = place.external_rating();
            let score = compute_personal_score(basis.preference, basis.weight, external_rating);

            let mut place = place;
            if place.vicinity.is_none() {
                place.vicinity = Some("Location not available".to_string());
            }

            Some(Recommendation {
                reasoning: basis.reasoning(cuisine, external_rating),
                place,
                cuisine,
                cuisine_score: reported_cuisine_score,
                combined_score: round2(score),
            })
        })
        .collect();

    // Stable: ties keep the upstream relevance order
    recommendations.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    recommendations.truncate(limit);

    Ranking {
        recommendations,
        considered,
        excluded,
    }
}

/// Ranks candidates against one user's profile
pub fn rank_personal(
    profile: &TasteProfile,
    cuisine: Cuisine,
    candidates: Vec<Place>,
    limit: usize,
) -> Ranking {
    let basis = ScoreBasis {
        preference: lookup_preference(profile, cuisine),
        weight: lookup_weight(profile, cuisine),
        audience: Audience::Personal,
    };
    rank(cuisine, basis, candidates, limit)
}

/// Ranks candidates against a group's aggregated profile
pub fn rank_group(
    policy: &dyn AggregationPolicy,
    profiles: &[TasteProfile],
    cuisine: Cuisine,
    candidates: Vec<Place>,
    limit: usize,
) -> Ranking {
    let aggregate = policy.aggregate(profiles, cuisine);
    let basis = ScoreBasis {
        preference: aggregate.preference,
        weight: aggregate.weight,
        audience: Audience::Group,
    };
    rank(cuisine, basis, candidates, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CuisineMap;
    use crate::services::aggregation::MeanAggregation;

    fn place(id: &str, rating: Option<f64>) -> Place {
        Place {
            place_id: id.to_string(),
            name: format!("Place {}", id),
            vicinity: Some("Somewhere".to_string()),
            rating,
            price_level: None,
            geometry: None,
            photos: Vec::new(),
            types: vec!["restaurant".to_string()],
            business_status: None,
        }
    }

    fn ids(ranking: &Ranking) -> Vec<&str> {
        ranking
            .recommendations
            .iter()
            .map(|r| r.place.place_id.as_str())
            .collect()
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), 4);
        assert_eq!(parse_limit(Some("10")), 10);
        assert_eq!(parse_limit(Some("0")), 4);
        assert_eq!(parse_limit(Some("-3")), 4);
        assert_eq!(parse_limit(Some("lots")), 4);
        assert_eq!(parse_limit(Some("2.5")), 4);
    }

    #[test]
    fn test_default_profile_scenario() {
        let ranking = rank_personal(
            &TasteProfile::default(),
            Cuisine::Japanese,
            vec![place("a", Some(4.5))],
            4,
        );

        let rec = &ranking.recommendations[0];
        assert_eq!(rec.cuisine, Cuisine::Japanese);
        assert_eq!(rec.cuisine_score, 3.0);
        assert_eq!(rec.combined_score, 3.45);
        assert_eq!(
            rec.reasoning,
            "Your Japanese preference (3.0/5) × weight (1.00) + restaurant rating (4.5/5)"
        );
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let candidates = vec![
            place("low", Some(2.0)),
            place("tie1", Some(4.0)),
            place("high", Some(5.0)),
            place("tie2", Some(4.0)),
            place("unrated", None),
        ];

        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates, 10);
        assert_eq!(ids(&ranking), vec!["high", "tie1", "tie2", "unrated", "low"]);
        assert!(ranking
            .recommendations
            .windows(2)
            .all(|pair| pair[0].combined_score >= pair[1].combined_score));
    }

    #[test]
    fn test_equal_scores_keep_search_order() {
        let candidates: Vec<Place> = (0..6).map(|i| place(&i.to_string(), Some(4.0))).collect();
        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates, 6);
        assert_eq!(ids(&ranking), vec!["0", "1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_length_is_min_of_limit_and_candidates() {
        let candidates: Vec<Place> = (0..3).map(|i| place(&i.to_string(), Some(3.0))).collect();

        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates.clone(), 10);
        assert_eq!(ranking.recommendations.len(), 3);

        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates.clone(), 2);
        assert_eq!(ranking.recommendations.len(), 2);

        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates, 0);
        assert_eq!(ranking.recommendations.len(), 3);
    }

    #[test]
    fn test_empty_candidates() {
        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, Vec::new(), 4);
        assert!(ranking.recommendations.is_empty());
        assert_eq!(ranking.considered, 0);
        assert_eq!(ranking.excluded, 0);
    }

    #[test]
    fn test_malformed_candidates_are_excluded_visibly() {
        let candidates = vec![
            place("good", Some(4.0)),
            place("", Some(5.0)),
            place("nan", Some(f64::NAN)),
            place("also-good", None),
        ];

        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, candidates, 10);
        assert_eq!(ranking.considered, 4);
        assert_eq!(ranking.excluded, 2);
        assert_eq!(ids(&ranking), vec!["good", "also-good"]);
    }

    #[test]
    fn test_missing_vicinity_is_filled() {
        let mut candidate = place("a", None);
        candidate.vicinity = None;
        let ranking = rank_personal(&TasteProfile::default(), Cuisine::Thai, vec![candidate], 4);
        assert_eq!(
            ranking.recommendations[0].place.vicinity.as_deref(),
            Some("Location not available")
        );
    }

    #[test]
    fn test_group_ranking_reports_aggregate() {
        let member = |p: f64| TasteProfile {
            preferences: [(Cuisine::Thai, p)].into_iter().collect::<CuisineMap>(),
            weights: [(Cuisine::Thai, 1.0)].into_iter().collect::<CuisineMap>(),
        };
        let profiles = vec![member(4.0), member(2.0)];

        let ranking = rank_group(
            &MeanAggregation,
            &profiles,
            Cuisine::Thai,
            vec![place("a", Some(4.0))],
            4,
        );

        let rec = &ranking.recommendations[0];
        assert_eq!(rec.cuisine_score, 3.0);
        assert_eq!(rec.combined_score, 3.3);
        assert!(rec.reasoning.starts_with("Group Thai preference (3.0/5 avg)"));
    }

    #[test]
    fn test_combined_score_is_clamped() {
        let profile = TasteProfile {
            preferences: [(Cuisine::Korean, 5.0)].into_iter().collect::<CuisineMap>(),
            weights: [(Cuisine::Korean, 1.5)].into_iter().collect::<CuisineMap>(),
        };
        let ranking = rank_personal(&profile, Cuisine::Korean, vec![place("a", Some(5.0))], 4);
        assert_eq!(ranking.recommendations[0].combined_score, 5.0);
        assert_eq!(ranking.recommendations[0].cuisine_score, 7.5);
    }
}
