use crate::error::GuideError;
use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A supported city. The set of cities is fixed at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub name_romanized: String,
    /// Catalog key and the value persisted as the last selection.
    pub slug: String,
    pub region: String,
    pub location: GeoPoint,
    pub emoji: String,
}

/// One row of `data/cities.csv`.
#[derive(Debug, Deserialize)]
pub struct CityRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub name_romanized: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub emoji: String,
}

impl TryFrom<CityRecord> for City {
    type Error = GuideError;

    fn try_from(record: CityRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            location: GeoPoint::new(record.latitude, record.longitude)?,
            id: record.id.trim().to_string(),
            slug: record.slug.trim().to_lowercase(),
            name: record.name,
            name_romanized: record.name_romanized,
            region: record.region,
            emoji: record.emoji,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub romanized_name: String,
    pub short_description: String,
    pub full_description: String,
    #[serde(default)]
    pub image_ref: String,
    /// 1-based display position within the city's list.
    pub rank: u32,
    pub price_range_local: String,
    pub price_range_foreign: String,
    pub preparation_note: Option<String>,
    pub cultural_note: Option<String>,
    pub city_id: String,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub order_phrases: Vec<OrderPhrase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub romanized_name: Option<String>,
    pub address: String,
    pub map_link: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

/// How to ask for a dish: the native phrase, its reading, and a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPhrase {
    pub id: String,
    pub native_text: String,
    pub romanized_text: String,
    pub translated_text: String,
}
