use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cuisine, Place};

/// A ranked candidate place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub place: Place,
    pub cuisine: Cuisine,
    /// preference × weight, rounded to 2 decimals
    pub cuisine_score: f64,
    /// Blended score in [1, 5], rounded to 2 decimals
    pub combined_score: f64,
    pub reasoning: String,
}

/// Ranked recommendations for one cuisine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub restaurants: Vec<Recommendation>,
    pub cuisine: Cuisine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
    /// Candidates returned by the place search, including malformed ones
    pub candidates_considered: usize,
    /// Candidates left out of ranking because their data was malformed
    pub candidates_excluded: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CuisineScore {
    pub cuisine: Cuisine,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopCuisinesResponse {
    pub top_cuisines: Vec<CuisineScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
}

/// Score prediction for a single place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub place_id: String,
    pub name: String,
    pub cuisine: Cuisine,
    pub external_rating: f64,
    pub personalized_score: f64,
    pub formula: String,
}

/// Outcome of a submitted rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingOutcome {
    pub restaurant_id: String,
    pub cuisine: Cuisine,
    pub rating: f64,
    pub previous_weight: f64,
    pub weight: f64,
}
