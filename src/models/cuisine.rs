use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// The fixed cuisine taxonomy every preference, weight and recommendation is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cuisine {
    Chinese,
    Korean,
    Japanese,
    Italian,
    Mexican,
    Indian,
    Thai,
    French,
    Muslim,
    Vietnamese,
    Western,
    #[serde(rename = "Fast Food")]
    FastFood,
}

impl Cuisine {
    /// All cuisines in taxonomy order
    pub const ALL: [Cuisine; 12] = [
        Cuisine::Chinese,
        Cuisine::Korean,
        Cuisine::Japanese,
        Cuisine::Italian,
        Cuisine::Mexican,
        Cuisine::Indian,
        Cuisine::Thai,
        Cuisine::French,
        Cuisine::Muslim,
        Cuisine::Vietnamese,
        Cuisine::Western,
        Cuisine::FastFood,
    ];

    /// Display label, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Cuisine::Chinese => "Chinese",
            Cuisine::Korean => "Korean",
            Cuisine::Japanese => "Japanese",
            Cuisine::Italian => "Italian",
            Cuisine::Mexican => "Mexican",
            Cuisine::Indian => "Indian",
            Cuisine::Thai => "Thai",
            Cuisine::French => "French",
            Cuisine::Muslim => "Muslim",
            Cuisine::Vietnamese => "Vietnamese",
            Cuisine::Western => "Western",
            Cuisine::FastFood => "Fast Food",
        }
    }

    /// Keyword sent to the place search when looking for this cuisine
    pub fn search_keyword(&self) -> String {
        format!("{} restaurant", self.as_str())
    }
}

impl Display for Cuisine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cuisine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Cuisine::ALL
            .into_iter()
            .find(|cuisine| cuisine.as_str() == label)
            .ok_or_else(|| {
                let labels: Vec<&str> = Cuisine::ALL.iter().map(Cuisine::as_str).collect();
                AppError::InvalidCuisine(format!(
                    "Invalid cuisine {:?}. Must be one of: {}",
                    s,
                    labels.join(", ")
                ))
            })
    }
}
