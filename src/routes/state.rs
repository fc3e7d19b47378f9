use std::sync::Arc;

use crate::{
    db::Store,
    services::{
        aggregation::{AggregationPolicy, MeanAggregation},
        auth::TokenManager,
        providers::PlaceProvider,
    },
};

/// Shared application state handed to every handler
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub places: Arc<dyn PlaceProvider>,
    pub tokens: TokenManager,
    pub aggregation: Arc<dyn AggregationPolicy>,
}

impl AppState {
    /// State with the default (unweighted mean) group aggregation
    pub fn new(store: Arc<dyn Store>, places: Arc<dyn PlaceProvider>, tokens: TokenManager) -> Self {
        Self {
            store,
            places,
            tokens,
            aggregation: Arc::new(MeanAggregation),
        }
    }

    pub fn with_aggregation(mut self, aggregation: Arc<dyn AggregationPolicy>) -> Self {
        self.aggregation = aggregation;
        self
    }
}
