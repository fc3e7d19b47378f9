pub mod aggregation;
pub mod auth;
pub mod groups;
pub mod providers;
pub mod ranking;
pub mod recommendations;
pub mod scoring;
pub mod users;
pub mod weights;
