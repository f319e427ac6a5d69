//! The bundled city and dish tables.
//!
//! Cities come from `data/cities.csv` and dishes from `data/dishes.toml`, both
//! compiled into the binary. [`Catalog::from_sources`] validates the tables
//! once at startup; lookups after that never fail.

use crate::error::GuideError;
use crate::models::{City, CityRecord, Dish};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

static CITIES_CSV: &str = include_str!("../data/cities.csv");
static DISHES_TOML: &str = include_str!("../data/dishes.toml");

/// Lookup from city slug to its ranked dish list.
pub trait ContentCatalog: Send + Sync {
    /// Dishes for `slug` in rank order. Unknown slugs yield an empty list.
    fn dishes_for(&self, slug: &str) -> Vec<Dish>;
}

#[derive(Deserialize)]
struct DishTable {
    #[serde(default, rename = "dish")]
    dishes: Vec<Dish>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    cities: Vec<City>,
    dishes: HashMap<String, Vec<Dish>>,
}

impl Catalog {
    pub fn embedded() -> Result<Self, GuideError> {
        Self::from_sources(CITIES_CSV, DISHES_TOML)
    }

    pub fn from_sources(cities_csv: &str, dishes_toml: &str) -> Result<Self, GuideError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(cities_csv.as_bytes());

        let mut cities = Vec::new();
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for record in rdr.deserialize::<CityRecord>() {
            let city = City::try_from(record?)?;
            if !ids.insert(city.id.clone()) {
                return Err(GuideError::DuplicateCity(city.id));
            }
            if !slugs.insert(city.slug.clone()) {
                return Err(GuideError::DuplicateCity(city.slug));
            }
            cities.push(city);
        }
        if cities.is_empty() {
            return Err(GuideError::EmptyCatalog);
        }

        let table: DishTable = toml::from_str(dishes_toml)?;
        let slug_by_id: HashMap<&str, &str> = cities
            .iter()
            .map(|c| (c.id.as_str(), c.slug.as_str()))
            .collect();

        let mut dishes: HashMap<String, Vec<Dish>> = HashMap::new();
        for dish in table.dishes {
            let slug = slug_by_id
                .get(dish.city_id.as_str())
                .ok_or_else(|| GuideError::UnknownCity(dish.city_id.clone()))?;
            let list = dishes.entry((*slug).to_string()).or_default();
            if list.iter().any(|d| d.rank == dish.rank) {
                return Err(GuideError::DuplicateRank {
                    city_id: dish.city_id,
                    rank: dish.rank,
                });
            }
            list.push(dish);
        }
        for list in dishes.values_mut() {
            list.sort_by_key(|d| d.rank);
        }

        info!(
            "Catalog loaded: {} cities, {} with dishes",
            cities.len(),
            dishes.len()
        );
        Ok(Self { cities, dishes })
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city_by_slug(&self, slug: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.slug == slug)
    }
}

impl ContentCatalog for Catalog {
    fn dishes_for(&self, slug: &str) -> Vec<Dish> {
        self.dishes.get(slug).cloned().unwrap_or_default()
    }
}

/// Cities whose name, romanized name or region contains `query`,
/// ignoring case. A blank query keeps every city, in catalog order.
pub fn filter_cities<'a>(cities: &'a [City], query: &str) -> Vec<&'a City> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return cities.iter().collect();
    }
    cities
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&q)
                || c.name_romanized.to_lowercase().contains(&q)
                || c.region.to_lowercase().contains(&q)
        })
        .collect()
}
