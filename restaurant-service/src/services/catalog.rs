//! In-memory restaurant catalog loaded from the static JSON dataset.
//!
//! The catalog is built once at startup and never mutated afterwards, so it is
//! shared between requests as a plain `Arc<Catalog>`. Every record is indexed
//! with pre-normalized text fields the search engine matches against.

use crate::models::Restaurant;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Error type for dataset loading.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Dataset contains no restaurants")]
    Empty,

    #[error("Restaurant at index {0} has a blank name")]
    BlankName(usize),
}

/// Accepted dataset layouts: a bare array or `{"restaurants": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    List(Vec<Restaurant>),
    Wrapped { restaurants: Vec<Restaurant> },
}

/// Lower-case, trim and collapse inner whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized form with all whitespace removed (`"여의도 한정식"` -> `"여의도한정식"`).
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A restaurant together with its normalized search fields.
#[derive(Debug, Clone)]
pub struct IndexedRestaurant {
    pub restaurant: Restaurant,
    pub name: String,
    pub name_compact: String,
    pub category: String,
    pub menu_names: Vec<String>,
    pub menu_descriptions: Vec<String>,
    pub full_text: String,
}

impl IndexedRestaurant {
    fn new(restaurant: Restaurant) -> Self {
        let name = normalize(&restaurant.name);
        let name_compact = compact(&restaurant.name);
        let category = normalize(&restaurant.category);
        let menu_names: Vec<String> = restaurant.menu.iter().map(|m| normalize(&m.name)).collect();
        let menu_descriptions: Vec<String> = restaurant
            .menu
            .iter()
            .map(|m| m.description.as_deref().map(normalize).unwrap_or_default())
            .collect();

        let mut full_text = format!("{} {}", name, category);
        for (menu_name, description) in menu_names.iter().zip(&menu_descriptions) {
            full_text.push(' ');
            full_text.push_str(menu_name);
            if !description.is_empty() {
                full_text.push(' ');
                full_text.push_str(description);
            }
        }

        Self {
            restaurant,
            name,
            name_compact,
            category,
            menu_names,
            menu_descriptions,
            full_text,
        }
    }
}

/// Read-only collection of every restaurant in the dataset.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<IndexedRestaurant>,
}

impl Catalog {
    /// Load and validate the dataset at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let catalog = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            restaurants = catalog.len(),
            "Loaded restaurant dataset"
        );

        Ok(catalog)
    }

    /// Parse a dataset from its JSON text.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let restaurants = match serde_json::from_str::<DatasetFile>(raw)? {
            DatasetFile::List(list) => list,
            DatasetFile::Wrapped { restaurants } => restaurants,
        };
        Self::from_restaurants(restaurants)
    }

    pub fn from_restaurants(restaurants: Vec<Restaurant>) -> Result<Self, CatalogError> {
        if restaurants.is_empty() {
            return Err(CatalogError::Empty);
        }

        let entries = restaurants
            .into_iter()
            .enumerate()
            .map(|(index, mut restaurant)| {
                if restaurant.name.trim().is_empty() {
                    return Err(CatalogError::BlankName(index));
                }
                if restaurant.restaurant_id.trim().is_empty() {
                    restaurant.restaurant_id = format!("r{}", index);
                }
                Ok(IndexedRestaurant::new(restaurant))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedRestaurant> {
        self.entries.iter()
    }

    pub fn get_by_id(&self, restaurant_id: &str) -> Option<&Restaurant> {
        self.entries
            .iter()
            .map(|e| &e.restaurant)
            .find(|r| r.restaurant_id == restaurant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_bare_array() {
        let catalog = Catalog::from_json(
            r#"[{"name": "진진", "category": "중식당", "menu": [{"name": "멘보샤"}]}]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        let entry = catalog.iter().next().unwrap();
        assert_eq!(entry.restaurant.restaurant_id, "r0");
        assert_eq!(entry.menu_names, vec!["멘보샤".to_string()]);
        assert!(entry.full_text.contains("중식당"));
    }

    #[test]
    fn loads_wrapped_object() {
        let catalog = Catalog::from_json(
            r#"{"restaurants": [{"restaurant_id": "abc", "name": "Starbucks IFC"}]}"#,
        )
        .unwrap();

        assert!(catalog.get_by_id("abc").is_some());
        assert_eq!(catalog.iter().next().unwrap().name, "starbucks ifc");
    }

    #[test]
    fn rejects_empty_dataset() {
        assert!(matches!(Catalog::from_json("[]"), Err(CatalogError::Empty)));
    }

    #[test]
    fn rejects_blank_name() {
        let result = Catalog::from_json(r#"[{"name": "a"}, {"name": "  "}]"#);
        assert!(matches!(result, Err(CatalogError::BlankName(1))));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let err = Catalog::load("does/not/exist.json").await.unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn normalization_helpers() {
        assert_eq!(normalize("  Yeouido   Hanjeongsik "), "yeouido hanjeongsik");
        assert_eq!(compact("여의도 한정식"), "여의도한정식");
    }
}
