use serde::{Deserialize, Serialize};

/// External rating assumed when the place search has none
pub const DEFAULT_EXTERNAL_RATING: f64 = 3.0;

/// Default search radius in meters
pub const DEFAULT_RADIUS: u32 = 2000;

/// Largest radius the place search accepts
pub const MAX_RADIUS: u32 = 50_000;

/// A candidate place as returned by the place search
///
/// Only `place_id`, `name` and `rating` feed the scoring engine; the rest is
/// passed through to clients untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub business_status: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Photo {
    pub photo_reference: String,
    pub height: u32,
    pub width: u32,
}

impl Place {
    /// Rating used for scoring
    pub fn external_rating(&self) -> f64 {
        self.rating.unwrap_or(DEFAULT_EXTERNAL_RATING)
    }

    /// Checks the fields the scoring engine relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.place_id.trim().is_empty() {
            return Err("missing place_id".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("missing name".to_string());
        }
        if let Some(rating) = self.rating {
            if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
                return Err(format!("rating {} outside 0-5", rating));
            }
        }
        Ok(())
    }
}

/// Parameters for a nearby place search
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSearchParams {
    pub lat: f64,
    pub lng: f64,
    pub keyword: Option<String>,
    pub radius: u32,
    pub place_type: String,
}

impl PlaceSearchParams {
    /// Restaurant search around a point
    pub fn restaurants(lat: f64, lng: f64, keyword: Option<String>, radius: Option<u32>) -> Self {
        Self {
            lat,
            lng,
            keyword,
            radius: radius.unwrap_or(DEFAULT_RADIUS),
            place_type: "restaurant".to_string(),
        }
    }

    /// Normalized form used as a cache key
    ///
    /// Coordinates are rounded to 4 decimals (~11m) so nearby requests share entries.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.4},{:.4}:{}:{}:{}",
            self.lat,
            self.lng,
            self.radius,
            self.place_type,
            self.keyword
                .as_deref()
                .map(|k| k.trim().to_lowercase())
                .unwrap_or_default()
        )
    }
}

/// Result of a nearby search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaceSearch {
    pub places: Vec<Place>,
    /// Upstream records that could not be decoded
    pub skipped: usize,
    pub status: String,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, rating: Option<f64>) -> Place {
        Place {
            place_id: id.to_string(),
            name: format!("Place {}", id),
            vicinity: None,
            rating,
            price_level: None,
            geometry: None,
            photos: Vec::new(),
            types: vec!["restaurant".to_string()],
            business_status: None,
        }
    }

    #[test]
    fn test_external_rating_defaults_to_three() {
        assert_eq!(place("a", None).external_rating(), 3.0);
        assert_eq!(place("a", Some(4.2)).external_rating(), 4.2);
    }

    #[test]
    fn test_validate() {
        assert!(place("a", Some(4.5)).validate().is_ok());
        assert!(place("a", None).validate().is_ok());
        assert!(place("", Some(4.5)).validate().is_err());
        assert!(place("a", Some(f64::NAN)).validate().is_err());
        assert!(place("a", Some(7.0)).validate().is_err());

        let mut nameless = place("a", None);
        nameless.name = "  ".to_string();
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn test_google_place_deserialization() {
        let json = r#"{
            "place_id": "ChIJ123",
            "name": "Ramen Keisuke",
            "vicinity": "1 Tras St",
            "rating": 4.4,
            "price_level": 2,
            "geometry": { "location": { "lat": 1.2765, "lng": 103.8437 } },
            "photos": [{ "photo_reference": "ref", "height": 400, "width": 600 }],
            "types": ["restaurant", "food"],
            "business_status": "OPERATIONAL"
        }"#;

        let place: Place = serde_json::from_str(json).unwrap();
        assert_eq!(place.place_id, "ChIJ123");
        assert_eq!(place.rating, Some(4.4));
        assert_eq!(place.geometry.unwrap().location.lng, 103.8437);
        assert_eq!(place.photos.len(), 1);
    }

    #[test]
    fn test_minimal_place_deserialization() {
        let place: Place = serde_json::from_str(r#"{ "place_id": "x", "name": "Y" }"#).unwrap();
        assert_eq!(place.rating, None);
        assert!(place.types.is_empty());
    }

    #[test]
    fn test_cache_key_normalizes() {
        let a = PlaceSearchParams::restaurants(1.352083, 103.819836, Some("Thai Restaurant ".to_string()), None);
        let b = PlaceSearchParams::restaurants(1.35208, 103.81984, Some("thai restaurant".to_string()), None);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "1.3521,103.8198:2000:restaurant:thai restaurant");
    }
}
