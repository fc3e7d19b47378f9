use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Cuisine;

/// Manual preference assumed for a cuisine with no stored entry
pub const DEFAULT_PREFERENCE: f64 = 3.0;

/// Learned weight assumed for a cuisine with no stored entry
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Manual preference every cuisine starts with at signup
pub const INITIAL_PREFERENCE: f64 = 1.0;

/// Learned weight bounds
pub const MIN_WEIGHT: f64 = 0.5;
pub const MAX_WEIGHT: f64 = 1.5;

/// Sparse mapping from cuisine to a number
///
/// Absent entries are distinct from stored zeros; callers read through
/// [`CuisineMap::get_or`] with the default that applies to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CuisineMap(BTreeMap<Cuisine, f64>);

impl CuisineMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a map holding `value` for every cuisine in the taxonomy
    pub fn uniform(value: f64) -> Self {
        Self(Cuisine::ALL.into_iter().map(|c| (c, value)).collect())
    }

    /// Stored value, if any
    pub fn get(&self, cuisine: Cuisine) -> Option<f64> {
        self.0.get(&cuisine).copied()
    }

    /// Stored value or `default` when absent
    pub fn get_or(&self, cuisine: Cuisine, default: f64) -> f64 {
        self.get(cuisine).unwrap_or(default)
    }

    pub fn set(&mut self, cuisine: Cuisine, value: f64) {
        self.0.insert(cuisine, value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cuisine, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }
}

impl FromIterator<(Cuisine, f64)> for CuisineMap {
    fn from_iter<I: IntoIterator<Item = (Cuisine, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A user's manual preferences and learned weights, as read by the scoring engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasteProfile {
    pub preferences: CuisineMap,
    pub weights: CuisineMap,
}

impl TasteProfile {
    /// Fresh profile for a newly created user
    pub fn initial() -> Self {
        Self {
            preferences: CuisineMap::uniform(INITIAL_PREFERENCE),
            weights: CuisineMap::uniform(DEFAULT_WEIGHT),
        }
    }

    /// Manual preference for `cuisine`, defaulting to [`DEFAULT_PREFERENCE`]
    pub fn preference(&self, cuisine: Cuisine) -> f64 {
        self.preferences.get_or(cuisine, DEFAULT_PREFERENCE)
    }

    /// Learned weight for `cuisine`, defaulting to [`DEFAULT_WEIGHT`]
    pub fn weight(&self, cuisine: Cuisine) -> f64 {
        self.weights.get_or(cuisine, DEFAULT_WEIGHT)
    }
}
