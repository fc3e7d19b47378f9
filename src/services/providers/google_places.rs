/// Google Places provider
///
/// Uses the legacy Nearby Search endpoint:
/// `/maps/api/place/nearbysearch/json?location=lat,lng&radius=..&type=..&keyword=..&key=..`
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Place, PlaceSearch, PlaceSearchParams},
    services::providers::PlaceProvider,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    status: String,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Clone)]
pub struct GooglePlacesProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl GooglePlacesProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        cache: Option<Cache>,
        cache_ttl: u64,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        })
    }

    async fn fetch(&self, params: &PlaceSearchParams) -> AppResult<PlaceSearch> {
        let url = format!("{}/maps/api/place/nearbysearch/json", self.api_url);

        let mut query = vec![
            ("location", format!("{},{}", params.lat, params.lng)),
            ("radius", params.radius.to_string()),
            ("type", params.place_type.clone()),
            ("key", self.api_key.clone()),
        ];
        if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            query.push(("keyword", keyword.to_string()));
        }

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Google Places request failed");
            return Err(AppError::Upstream(format!(
                "Google Places API returned status {}: {}",
                status, body
            )));
        }

        let body: NearbySearchResponse = response.json().await?;
        parse_response(body)
    }
}

/// Turns a raw Nearby Search body into a [`PlaceSearch`]
///
/// 1. Any status other than `OK` / `ZERO_RESULTS` is an upstream failure
/// 2. Each result is decoded on its own; failures are counted, not fatal
fn parse_response(body: NearbySearchResponse) -> AppResult<PlaceSearch> {
    if body.status != "OK" && body.status != "ZERO_RESULTS" {
        let detail = body
            .error_message
            .map(|msg| format!(": {}", msg))
            .unwrap_or_default();
        tracing::error!(status = %body.status, "Google Places returned an error status");
        return Err(AppError::Upstream(format!(
            "Google Places API error: {}{}",
            body.status, detail
        )));
    }

    let mut skipped = 0;
    let places: Vec<Place> = body
        .results
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Place>(raw) {
            Ok(place) => Some(place),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable place record");
                skipped += 1;
                None
            }
        })
        .collect();

    Ok(PlaceSearch {
        places,
        skipped,
        status: body.status,
        next_page_token: body.next_page_token,
    })
}

#[async_trait::async_trait]
impl PlaceProvider for GooglePlacesProvider {
    async fn search_nearby(&self, params: &PlaceSearchParams) -> AppResult<PlaceSearch> {
        let key = CacheKey::NearbySearch(params.cache_key());

        let search: PlaceSearch = cached!(self.cache.as_ref(), key, self.cache_ttl, async {
            self.fetch(params).await
        })?;

        tracing::info!(
            provider = self.name(),
            keyword = params.keyword.as_deref().unwrap_or(""),
            radius = params.radius,
            results = search.places.len(),
            skipped = search.skipped,
            "Nearby search completed"
        );

        Ok(search)
    }

    fn name(&self) -> &'static str {
        "google_places"
    }
}
