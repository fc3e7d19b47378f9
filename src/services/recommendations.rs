use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Cuisine, PlaceSearchParams, Prediction, RatingOutcome, RecommendationResponse,
        TasteProfile, TopCuisinesResponse, DEFAULT_EXTERNAL_RATING,
    },
    services::{
        aggregation::{group_top_cuisines, personal_top_cuisines, AggregationPolicy},
        providers::PlaceProvider,
        ranking::{rank_group, rank_personal, Ranking},
        scoring::{compute_personal_score, lookup_preference, lookup_weight, round2, FORMULA},
        weights,
    },
};

/// Where and what to search for
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub lat: f64,
    pub lng: f64,
    pub cuisine: Cuisine,
    pub radius: Option<u32>,
    pub limit: usize,
}

impl RecommendationQuery {
    fn search_params(&self) -> PlaceSearchParams {
        PlaceSearchParams::restaurants(
            self.lat,
            self.lng,
            Some(self.cuisine.search_keyword()),
            self.radius,
        )
    }
}

/// A place to score without searching for it
#[derive(Debug, Clone)]
pub struct PredictQuery {
    pub place_id: String,
    pub name: String,
    pub cuisine: Cuisine,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub restaurant_id: String,
    pub cuisine: String,
    pub rating: f64,
    #[serde(default)]
    pub external_rating: Option<f64>,
}

fn validate_external_rating(rating: Option<f64>) -> AppResult<f64> {
    match rating {
        None => Ok(DEFAULT_EXTERNAL_RATING),
        Some(r) if r.is_finite() && (0.0..=5.0).contains(&r) => Ok(r),
        Some(r) => Err(AppError::InvalidInput(format!(
            "External rating must be between 0 and 5, got {}",
            r
        ))),
    }
}

/// Loads a group and checks that `user_id` belongs to it
async fn member_group_profiles(
    store: &dyn Store,
    user_id: Uuid,
    group_id: Uuid,
) -> AppResult<Vec<TasteProfile>> {
    let group = store.get_group(group_id).await?;
    if !group.is_member(user_id) {
        return Err(AppError::Forbidden(
            "You are not a member of this group".to_string(),
        ));
    }
    store.get_profiles(&group.member_ids()).await
}

/// Best cuisines for a user, or for one of their groups when `group_id` is given
pub async fn top_cuisines(
    store: &dyn Store,
    policy: &dyn AggregationPolicy,
    user_id: Uuid,
    group_id: Option<Uuid>,
) -> AppResult<TopCuisinesResponse> {
    let top_cuisines = match group_id {
        Some(group_id) => {
            let profiles = member_group_profiles(store, user_id, group_id).await?;
            group_top_cuisines(policy, &profiles)
        }
        None => personal_top_cuisines(&store.get_profile(user_id).await?),
    };

    Ok(TopCuisinesResponse {
        top_cuisines,
        group_id,
        generated_at: Utc::now(),
    })
}

fn into_response(
    ranking: Ranking,
    cuisine: Cuisine,
    group_id: Option<Uuid>,
    skipped: usize,
) -> RecommendationResponse {
    RecommendationResponse {
        restaurants: ranking.recommendations,
        cuisine,
        group_id,
        generated_at: Utc::now(),
        candidates_considered: ranking.considered + skipped,
        candidates_excluded: ranking.excluded + skipped,
    }
}

/// Ranks nearby places of one cuisine for a single user
///
/// 1. Load the user's profile (missing user is NotFound)
/// 2. Search `"<cuisine> restaurant"` around the point
/// 3. Rank candidates against the profile
pub async fn personal_recommendations(
    store: &dyn Store,
    provider: &dyn PlaceProvider,
    user_id: Uuid,
    query: RecommendationQuery,
) -> AppResult<RecommendationResponse> {
    let start = Instant::now();

    // 1. Profile
    let profile = store.get_profile(user_id).await?;

    // 2. Candidates
    let search = provider.search_nearby(&query.search_params()).await?;

    // 3. Rank
    let ranking = rank_personal(&profile, query.cuisine, search.places, query.limit);

    tracing::info!(
        user_id = %user_id,
        cuisine = %query.cuisine,
        returned = ranking.recommendations.len(),
        excluded = ranking.excluded + search.skipped,
        processing_time_ms = start.elapsed().as_millis(),
        "Generated personal recommendations"
    );

    Ok(into_response(ranking, query.cuisine, None, search.skipped))
}

/// Ranks nearby places of one cuisine for a group the caller belongs to
///
/// 1. Load the group and check membership (non-member is Forbidden)
/// 2. Load every member's profile
/// 3. Search `"<cuisine> restaurant"` around the point
/// 4. Rank candidates against the aggregated profile
pub async fn group_recommendations(
    store: &dyn Store,
    provider: &dyn PlaceProvider,
    policy: &dyn AggregationPolicy,
    user_id: Uuid,
    group_id: Uuid,
    query: RecommendationQuery,
) -> AppResult<RecommendationResponse> {
    let start = Instant::now();

    // 1-2. Membership and profiles
    let profiles = member_group_profiles(store, user_id, group_id).await?;

    // 3. Candidates
    let search = provider.search_nearby(&query.search_params()).await?;

    // 4. Rank
    let ranking = rank_group(policy, &profiles, query.cuisine, search.places, query.limit);

    tracing::info!(
        user_id = %user_id,
        group_id = %group_id,
        members = profiles.len(),
        cuisine = %query.cuisine,
        returned = ranking.recommendations.len(),
        excluded = ranking.excluded + search.skipped,
        processing_time_ms = start.elapsed().as_millis(),
        "Generated group recommendations"
    );

    Ok(into_response(ranking, query.cuisine, Some(group_id), search.skipped))
}

/// Personalized score for one place, without a search
pub async fn predict(store: &dyn Store, user_id: Uuid, query: PredictQuery) -> AppResult<Prediction> {
    if query.place_id.trim().is_empty() || query.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "place_id and name are required".to_string(),
        ));
    }
    let external_rating = validate_external_rating(query.rating)?;

    let profile = store.get_profile(user_id).await?;
    let score = compute_personal_score(
        lookup_preference(&profile, query.cuisine),
        lookup_weight(&profile, query.cuisine),
        external_rating,
    );

    Ok(Prediction {
        place_id: query.place_id,
        name: query.name,
        cuisine: query.cuisine,
        external_rating,
        personalized_score: round2(score),
        formula: FORMULA.to_string(),
    })
}

/// Records a user's rating of a visited place and adapts their weight
pub async fn submit_rating(
    store: &dyn Store,
    user_id: Uuid,
    request: RatingRequest,
) -> AppResult<RatingOutcome> {
    if request.restaurant_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Restaurant ID is required".to_string(),
        ));
    }
    let cuisine: Cuisine = request.cuisine.parse()?;
    let external_rating = validate_external_rating(request.external_rating)?;

    let change =
        weights::submit_rating(store, user_id, cuisine, request.rating, external_rating).await?;

    tracing::info!(
        user_id = %user_id,
        restaurant_id = %request.restaurant_id,
        cuisine = %cuisine,
        rating = request.rating,
        "Rating submitted"
    );

    Ok(RatingOutcome {
        restaurant_id: request.restaurant_id,
        cuisine,
        rating: request.rating,
        previous_weight: change.previous,
        weight: change.current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Group, GroupMember, NewUser, Place, PlaceSearch, Role, User};
    use crate::services::aggregation::MeanAggregation;
    use crate::services::providers::MockPlaceProvider;

    async fn add_user(store: &MemoryStore, username: &str) -> Uuid {
        store
            .insert_user(User::create(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: username.to_string(),
                last_name: "Test".to_string(),
                password_hash: "hash".to_string(),
            }))
            .await
            .unwrap()
            .id
    }

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

    fn provider_returning(places: Vec<Place>, skipped: usize) -> MockPlaceProvider {
        let mut provider = MockPlaceProvider::new();
        provider
            .expect_search_nearby()
            .withf(|params| params.keyword.as_deref() == Some("Thai restaurant"))
            .returning(move |_| {
                Ok(PlaceSearch {
                    places: places.clone(),
                    skipped,
                    status: "OK".to_string(),
                    next_page_token: None,
                })
            });
        provider
    }

    fn thai_query(limit: usize) -> RecommendationQuery {
        RecommendationQuery {
            lat: 1.3,
            lng: 103.8,
            cuisine: Cuisine::Thai,
            radius: None,
            limit,
        }
    }

    #[tokio::test]
    async fn test_personal_recommendations() {
        let store = MemoryStore::new();
        let user = add_user(&store, "amy").await;
        store.set_preferences(user, &[(Cuisine::Thai, 3.0)]).await.unwrap();
        let provider = provider_returning(vec![place("a", Some(3.0)), place("b", Some(4.5))], 0);

        let response = personal_recommendations(&store, &provider, user, thai_query(4))
            .await
            .unwrap();

        assert_eq!(response.cuisine, Cuisine::Thai);
        assert_eq!(response.group_id, None);
        assert_eq!(response.restaurants[0].place.place_id, "b");
        assert_eq!(response.restaurants[0].combined_score, 3.45);
        assert_eq!(response.candidates_considered, 2);
        assert_eq!(response.candidates_excluded, 0);
    }

    #[tokio::test]
    async fn test_skipped_records_are_reported() {
        let store = MemoryStore::new();
        let user = add_user(&store, "amy").await;
        let provider = provider_returning(vec![place("a", Some(3.0)), place("", Some(3.0))], 2);

        let response = personal_recommendations(&store, &provider, user, thai_query(4))
            .await
            .unwrap();
        assert_eq!(response.restaurants.len(), 1);
        assert_eq!(response.candidates_considered, 4);
        assert_eq!(response.candidates_excluded, 3);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let store = MemoryStore::new();
        let user = add_user(&store, "amy").await;
        let mut provider = MockPlaceProvider::new();
        provider
            .expect_search_nearby()
            .returning(|_| Err(AppError::Upstream("quota".to_string())));

        let result = personal_recommendations(&store, &provider, user, thai_query(4)).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let mut provider = MockPlaceProvider::new();
        provider.expect_search_nearby().never();

        let result = personal_recommendations(&store, &provider, Uuid::new_v4(), thai_query(4)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    async fn thai_group(store: &MemoryStore) -> (Uuid, Uuid, Uuid) {
        let a = add_user(store, "amy").await;
        let b = add_user(store, "ben").await;
        store.set_preferences(a, &[(Cuisine::Thai, 4.0)]).await.unwrap();
        store.set_preferences(b, &[(Cuisine::Thai, 2.0)]).await.unwrap();

        let mut group = Group::create("Thai Fans".to_string(), None, "THAI01".to_string(), a);
        group.members.push(GroupMember { user_id: b, role: Role::Member });
        let group = store.insert_group(group).await.unwrap();
        (group.id, a, b)
    }

    #[tokio::test]
    async fn test_group_recommendations_average_members() {
        let store = MemoryStore::new();
        let (group_id, a, _) = thai_group(&store).await;
        let provider = provider_returning(vec![place("a", Some(4.0))], 0);

        let response = group_recommendations(
            &store,
            &provider,
            &MeanAggregation,
            a,
            group_id,
            thai_query(4),
        )
        .await
        .unwrap();

        assert_eq!(response.group_id, Some(group_id));
        assert_eq!(response.restaurants[0].cuisine_score, 3.0);
        assert_eq!(response.restaurants[0].combined_score, 3.3);
    }

    #[tokio::test]
    async fn test_group_recommendations_require_membership() {
        let store = MemoryStore::new();
        let (group_id, _, _) = thai_group(&store).await;
        let outsider = add_user(&store, "cat").await;
        let mut provider = MockPlaceProvider::new();
        provider.expect_search_nearby().never();

        let result = group_recommendations(
            &store,
            &provider,
            &MeanAggregation,
            outsider,
            group_id,
            thai_query(4),
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let missing = group_recommendations(
            &store,
            &provider,
            &MeanAggregation,
            outsider,
            Uuid::new_v4(),
            thai_query(4),
        )
        .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_top_cuisines_personal_and_group() {
        let store = MemoryStore::new();
        let (group_id, a, _) = thai_group(&store).await;

        let personal = top_cuisines(&store, &MeanAggregation, a, None).await.unwrap();
        assert_eq!(personal.top_cuisines.len(), 6);
        assert_eq!(personal.top_cuisines[0].cuisine, Cuisine::Thai);
        assert_eq!(personal.top_cuisines[0].score, 4.0);
        assert_eq!(personal.group_id, None);

        let group = top_cuisines(&store, &MeanAggregation, a, Some(group_id)).await.unwrap();
        assert_eq!(group.top_cuisines[0].cuisine, Cuisine::Thai);
        assert_eq!(group.top_cuisines[0].score, 3.0);
        assert_eq!(group.group_id, Some(group_id));
    }

    #[tokio::test]
    async fn test_predict() {
        let store = MemoryStore::new();
        let user = add_user(&store, "amy").await;
        store.set_preferences(user, &[(Cuisine::Japanese, 3.0)]).await.unwrap();

        let prediction = predict(
            &store,
            user,
            PredictQuery {
                place_id: "p1".to_string(),
                name: "Sushi Bar".to_string(),
                cuisine: Cuisine::Japanese,
                rating: Some(4.5),
            },
        )
        .await
        .unwrap();
        assert_eq!(prediction.personalized_score, 3.45);
        assert_eq!(prediction.formula, FORMULA);

        let unrated = predict(
            &store,
            user,
            PredictQuery {
                place_id: "p2".to_string(),
                name: "Ramen".to_string(),
                cuisine: Cuisine::Japanese,
                rating: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(unrated.external_rating, 3.0);
        assert_eq!(unrated.personalized_score, 3.0);
    }

    #[tokio::test]
    async fn test_submit_rating() {
        let store = MemoryStore::new();
        let user = add_user(&store, "amy").await;
        store.set_preferences(user, &[(Cuisine::Japanese, 3.0)]).await.unwrap();

        let outcome = submit_rating(
            &store,
            user,
            RatingRequest {
                restaurant_id: "p1".to_string(),
                cuisine: "Japanese".to_string(),
                rating: 5.0,
                external_rating: Some(4.5),
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.previous_weight, 1.0);
        assert!((outcome.weight - 1.15).abs() < 1e-9);

        let bad_cuisine = submit_rating(
            &store,
            user,
            RatingRequest {
                restaurant_id: "p1".to_string(),
                cuisine: "Martian".to_string(),
                rating: 5.0,
                external_rating: None,
            },
        )
        .await;
        assert!(matches!(bad_cuisine, Err(AppError::InvalidCuisine(_))));

        let bad_rating = submit_rating(
            &store,
            user,
            RatingRequest {
                restaurant_id: "p1".to_string(),
                cuisine: "Japanese".to_string(),
                rating: 0.0,
                external_rating: None,
            },
        )
        .await;
        assert!(matches!(bad_rating, Err(AppError::InvalidRating(_))));
    }
}
