use uuid::Uuid;

use crate::{
    db::{Store, WeightChange},
    error::{AppError, AppResult},
    models::{Cuisine, MAX_WEIGHT, MIN_WEIGHT},
};

use super::scoring::compute_personal_score;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Weight step for a prediction error (actual − predicted)
///
/// | error            | delta |
/// |------------------|-------|
/// | > 1.0            | +0.15 |
/// | (0.5, 1.0]       | +0.08 |
/// | [-0.5, 0.5]      | 0     |
/// | [-1.0, -0.5)     | -0.08 |
/// | < -1.0           | -0.15 |
pub fn weight_delta(error: f64) -> f64 {
    if error > 1.0 {
        0.15
    } else if error > 0.5 {
        0.08
    } else if error < -1.0 {
        -0.15
    } else if error < -0.5 {
        -0.08
    } else {
        0.0
    }
}

/// New weight after observing `actual_rating`
///
/// The prediction is recomputed from the weight in effect now, not the one
/// shown when the recommendation was made.
pub fn adjust_weight(
    preference: f64,
    current_weight: f64,
    actual_rating: f64,
    external_rating: f64,
) -> f64 {
    let predicted = compute_personal_score(preference, current_weight, external_rating);
    let error = actual_rating - predicted;
    (current_weight + weight_delta(error)).clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Rejects ratings outside [1, 5]
pub fn validate_rating(actual_rating: f64) -> AppResult<()> {
    if !actual_rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&actual_rating) {
        return Err(AppError::InvalidRating(actual_rating));
    }
    Ok(())
}

/// Updates a user's learned weight for `cuisine` from an observed rating
///
/// This is the only code path that writes weights. The store applies the
/// adjustment atomically against the stored (preference, weight) pair, so
/// concurrent ratings for the same cuisine each see the previous result.
/// Repeated calls accumulate: two ratings in the same error band move the
/// weight twice.
pub async fn submit_rating(
    store: &dyn Store,
    user_id: Uuid,
    cuisine: Cuisine,
    actual_rating: f64,
    external_rating: f64,
) -> AppResult<WeightChange> {
    validate_rating(actual_rating)?;
    if !external_rating.is_finite() {
        return Err(AppError::InvalidInput(
            "External rating must be a finite number".to_string(),
        ));
    }

    let change = store
        .update_weight(user_id, cuisine, &|preference, current_weight| {
            adjust_weight(preference, current_weight, actual_rating, external_rating)
        })
        .await?;

    tracing::info!(
        user_id = %user_id,
        cuisine = %cuisine,
        actual_rating,
        external_rating,
        previous_weight = change.previous,
        weight = change.current,
        "Updated cuisine weight"
    );

    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewUser, User};

    async fn store_with_user() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = User::create(NewUser {
            username: "rater".to_string(),
            email: "rater@example.com".to_string(),
            first_name: "Ra".to_string(),
            last_name: "Ter".to_string(),
            password_hash: "hash".to_string(),
        });
        let id = user.id;
        store.insert_user(user).await.unwrap();
        (store, id)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weight_delta_breakpoints() {
        assert_eq!(weight_delta(1.55), 0.15);
        assert_eq!(weight_delta(1.0001), 0.15);
        assert_eq!(weight_delta(1.0), 0.08);
        assert_eq!(weight_delta(0.75), 0.08);
        assert_eq!(weight_delta(0.5001), 0.08);
        assert_eq!(weight_delta(0.5), 0.0);
        assert_eq!(weight_delta(0.0), 0.0);
        assert_eq!(weight_delta(-0.5), 0.0);
        assert_eq!(weight_delta(-0.5001), -0.08);
        assert_eq!(weight_delta(-1.0), -0.08);
        assert_eq!(weight_delta(-1.0001), -0.15);
        assert_eq!(weight_delta(-4.0), -0.15);
    }

    #[test]
    fn test_adjust_weight_scenario() {
        // predicted 3.45, actual 5 → error 1.55
        assert!(approx(adjust_weight(3.0, 1.0, 5.0, 4.5), 1.15));
    }

    #[test]
    fn test_adjust_weight_within_band_is_unchanged() {
        assert_eq!(adjust_weight(3.0, 1.0, 3.5, 4.5), 1.0);
    }

    #[test]
    fn test_adjust_weight_clamps() {
        assert_eq!(adjust_weight(1.0, 1.45, 5.0, 1.0), 1.5);
        assert_eq!(adjust_weight(5.0, 0.55, 1.0, 5.0), 0.5);
    }

    #[test]
    fn test_weight_stays_bounded_for_any_sequence() {
        let ratings = [1.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 3.0];
        for preference in [1.0, 3.0, 5.0] {
            for external in [1.0, 3.0, 5.0] {
                let mut weight = 1.0;
                for rating in ratings {
                    weight = adjust_weight(preference, weight, rating, external);
                    assert!((MIN_WEIGHT..=MAX_WEIGHT).contains(&weight));
                }
            }
        }
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(matches!(validate_rating(0.5), Err(AppError::InvalidRating(_))));
        assert!(matches!(validate_rating(5.5), Err(AppError::InvalidRating(_))));
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_submit_rating_updates_store() {
        let (store, user_id) = store_with_user().await;

        // initial profile has preference 1: predicted = 4.5×0.3 + 1×0.7 = 2.05
        let change = submit_rating(&store, user_id, Cuisine::Japanese, 5.0, 4.5)
            .await
            .unwrap();
        assert_eq!(change.previous, 1.0);
        assert!(approx(change.current, 1.15));

        let profile = store.get_profile(user_id).await.unwrap();
        assert!(approx(profile.weight(Cuisine::Japanese), 1.15));
        assert_eq!(profile.weight(Cuisine::Thai), 1.0);
    }

    #[tokio::test]
    async fn test_submit_rating_accumulates() {
        let (store, user_id) = store_with_user().await;

        submit_rating(&store, user_id, Cuisine::Korean, 5.0, 5.0).await.unwrap();
        let change = submit_rating(&store, user_id, Cuisine::Korean, 5.0, 5.0).await.unwrap();

        assert!(approx(change.previous, 1.15));
        assert!(approx(change.current, 1.30));
    }

    #[tokio::test]
    async fn test_submit_rating_rejects_out_of_range() {
        let (store, user_id) = store_with_user().await;
        let result = submit_rating(&store, user_id, Cuisine::Korean, 6.0, 4.0).await;
        tokio_test::assert_err!(result);

        let profile = store.get_profile(user_id).await.unwrap();
        assert_eq!(profile.weight(Cuisine::Korean), 1.0);
    }

    #[tokio::test]
    async fn test_submit_rating_unknown_user() {
        let store = MemoryStore::new();
        let result = submit_rating(&store, Uuid::new_v4(), Cuisine::Thai, 4.0, 4.0).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_ratings_are_not_lost() {
        let (store, user_id) = store_with_user().await;
        let store = std::sync::Arc::new(store);

        // preference 1, external 5: predicted stays ≤ 2.55, so each rating of 5 adds 0.15
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    submit_rating(store.as_ref(), user_id, Cuisine::Italian, 5.0, 5.0).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let profile = store.get_profile(user_id).await.unwrap();
        assert!(approx(profile.weight(Cuisine::Italian), 1.45));
    }
}
