mod cuisine;
mod group;
mod place;
mod profile;
mod recommendation;
mod user;

pub use cuisine::Cuisine;
pub use group::{Group, GroupMember, GroupResponse, MemberResponse, Role};
pub use place::{
    Geometry, LatLng, Photo, Place, PlaceSearch, PlaceSearchParams, DEFAULT_EXTERNAL_RATING,
    DEFAULT_RADIUS, MAX_RADIUS,
};
pub use profile::{
    CuisineMap, TasteProfile, DEFAULT_PREFERENCE, DEFAULT_WEIGHT, INITIAL_PREFERENCE, MAX_WEIGHT,
    MIN_WEIGHT,
};
pub use recommendation::{
    CuisineScore, Prediction, RatingOutcome, Recommendation, RecommendationResponse,
    TopCuisinesResponse,
};
pub use user::{NewUser, PublicUser, User, UserSummary};
