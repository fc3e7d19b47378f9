/// Place search provider abstraction
///
/// Recommendation code only sees [`PlaceProvider`]; the concrete search
/// backend (Google Places today) is chosen at startup.
use crate::{
    error::AppResult,
    models::{PlaceSearch, PlaceSearchParams},
};

pub mod google_places;

pub use google_places::GooglePlacesProvider;

/// Source of candidate places near a point
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Places matching `params`, in the provider's relevance order
    ///
    /// Records that cannot be decoded are counted in `PlaceSearch::skipped`
    /// instead of failing the whole search. Provider-side failures surface as
    /// `AppError::Upstream`.
    async fn search_nearby(&self, params: &PlaceSearchParams) -> AppResult<PlaceSearch>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
