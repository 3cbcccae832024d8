//! Retrieval over the in-memory catalog.
//!
//! Each public method backs one assistant tool. Results are ranked by score
//! (descending) with the restaurant name as tie-breaker, `total` counts every
//! match before the `limit` cut, and scores are rounded to two decimals.

use crate::models::MenuItem;
use crate::services::catalog::{compact, normalize, Catalog, IndexedRestaurant};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

const MAX_MATCHING_MENUS: usize = 3;
const MAX_PRICE_RANGE_MENUS: usize = 5;
const TOP_CATEGORIES: usize = 10;
const UNCATEGORIZED: &str = "uncategorized";

// Unified search weights.
const EXACT_NAME: f64 = 30.0;
const EXACT_CATEGORY: f64 = 24.0;
const NAME_CONTAINS: f64 = 10.0;
const CATEGORY_CONTAINS: f64 = 6.0;
const MENU_NAME_CONTAINS: f64 = 20.0;
const MENU_DESCRIPTION_CONTAINS: f64 = 8.0;
const TOKEN_NAME: f64 = 5.0;
const TOKEN_CATEGORY: f64 = 3.0;
const TOKEN_MENU: f64 = 3.0;
const TOKEN_FULL_TEXT: f64 = 1.0;

/// Error type for search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Restaurant not found: {0}")]
    NotFound(String),

    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub category: String,
    pub score: f64,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<MenuItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub total: usize,
    pub results: Vec<SearchHit>,
    pub query: String,
    pub search_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryHit {
    pub name: String,
    pub category: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResults {
    pub total: usize,
    pub results: Vec<CategoryHit>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuMatch {
    pub name: String,
    pub price: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuHit {
    pub name: String,
    pub category: String,
    pub score: f64,
    pub matching_menus: Vec<MenuMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuResults {
    pub total: usize,
    pub results: Vec<MenuHit>,
    pub menu_keyword: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedMenu {
    pub name: String,
    pub price: Option<String>,
    pub price_numeric: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceHit {
    pub name: String,
    pub category: String,
    pub score: f64,
    pub price_range_menus: Vec<PricedMenu>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceResults {
    pub total: usize,
    pub results: Vec<PriceHit>,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantDetails {
    pub name: String,
    pub category: String,
    pub menu: Vec<MenuItem>,
    pub menu_count: usize,
    pub images: Vec<String>,
    pub restaurant_id: String,
    pub indexed_at: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_restaurants: usize,
    pub total_menus: usize,
    pub average_menus_per_restaurant: f64,
    pub categories: BTreeMap<String, usize>,
    pub top_categories: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub name: String,
    pub category: String,
    pub similarity_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub base_restaurant: String,
    pub base_category: String,
    pub recommendations: Vec<Recommendation>,
    pub total: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

fn required(value: &str, field: &str) -> Result<String, SearchError> {
    let normalized = normalize(value);
    if normalized.is_empty() {
        return Err(SearchError::InvalidRequest(format!("{} must not be empty", field)));
    }
    Ok(normalized)
}

/// Sort by score descending then name ascending, and cut to `limit`.
/// Returns the number of matches before truncation.
fn rank<T>(scored: &mut Vec<(f64, &IndexedRestaurant, T)>, limit: usize) -> usize {
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.restaurant.name.cmp(&b.1.restaurant.name))
    });
    let total = scored.len();
    scored.truncate(clamp_limit(limit));
    total
}

/// Search engine over a shared catalog.
#[derive(Debug, Clone)]
pub struct RestaurantSearch {
    catalog: Arc<Catalog>,
}

impl RestaurantSearch {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Unified search across name, category and menu.
    pub fn search_restaurants(
        &self,
        query: &str,
        limit: usize,
        include_details: bool,
    ) -> Result<SearchResults, SearchError> {
        let start = Instant::now();
        let q = required(query, "query")?;
        let tokens: Vec<&str> = q.split(' ').collect();

        let mut scored: Vec<(f64, &IndexedRestaurant, ())> = self
            .catalog
            .iter()
            .filter_map(|entry| {
                let score = unified_score(entry, &q, &tokens);
                (score > 0.0).then_some((score, entry, ()))
            })
            .collect();

        let total = rank(&mut scored, limit);

        let results = scored
            .into_iter()
            .map(|(score, entry, ())| {
                let r = &entry.restaurant;
                SearchHit {
                    name: r.name.clone(),
                    category: r.category.clone(),
                    score: round2(score),
                    id: r.restaurant_id.clone(),
                    menu: include_details.then(|| r.menu.clone()),
                    menu_count: include_details.then_some(r.menu.len()),
                }
            })
            .collect();

        let search_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(query = %q, total, search_time_ms, "Unified search completed");

        Ok(SearchResults {
            total,
            results,
            query: query.to_string(),
            search_time_ms,
        })
    }

    pub fn search_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<CategoryResults, SearchError> {
        let q = required(category, "category")?;

        let mut scored: Vec<(f64, &IndexedRestaurant, ())> = self
            .catalog
            .iter()
            .filter_map(|entry| {
                let mut score = 0.0;
                if entry.category == q {
                    score += 2.0;
                }
                if entry.category.contains(&q) {
                    score += 1.0;
                }
                (score > 0.0).then_some((score, entry, ()))
            })
            .collect();

        let total = rank(&mut scored, limit);

        let results = scored
            .into_iter()
            .map(|(score, entry, ())| CategoryHit {
                name: entry.restaurant.name.clone(),
                category: entry.restaurant.category.clone(),
                score: round2(score),
            })
            .collect();

        Ok(CategoryResults {
            total,
            results,
            category: category.to_string(),
        })
    }

    pub fn search_by_menu(
        &self,
        menu_keyword: &str,
        limit: usize,
    ) -> Result<MenuResults, SearchError> {
        let q = required(menu_keyword, "menu_keyword")?;

        let mut scored: Vec<(f64, &IndexedRestaurant, Vec<MenuMatch>)> = self
            .catalog
            .iter()
            .filter_map(|entry| {
                let mut score = 0.0;
                let mut matches = Vec::new();

                for (i, item) in entry.restaurant.menu.iter().enumerate() {
                    let name_hit = entry.menu_names[i].contains(&q);
                    let description_hit = entry.menu_descriptions[i].contains(&q);
                    if name_hit {
                        score += 3.0;
                    }
                    if description_hit {
                        score += 1.0;
                    }
                    if (name_hit || description_hit) && matches.len() < MAX_MATCHING_MENUS {
                        matches.push(MenuMatch {
                            name: item.name.clone(),
                            price: item.price.clone(),
                        });
                    }
                }

                (score > 0.0).then_some((score, entry, matches))
            })
            .collect();

        let total = rank(&mut scored, limit);

        let results = scored
            .into_iter()
            .map(|(score, entry, matching_menus)| MenuHit {
                name: entry.restaurant.name.clone(),
                category: entry.restaurant.category.clone(),
                score: round2(score),
                matching_menus,
            })
            .collect();

        Ok(MenuResults {
            total,
            results,
            menu_keyword: menu_keyword.to_string(),
        })
    }

    /// Restaurants with at least one menu item priced inside the inclusive range.
    pub fn search_by_price_range(
        &self,
        min_price: Option<u32>,
        max_price: Option<u32>,
        limit: usize,
    ) -> Result<PriceResults, SearchError> {
        if min_price.is_none() && max_price.is_none() {
            return Err(SearchError::InvalidRequest(
                "at least one of min_price or max_price is required".to_string(),
            ));
        }
        let low = min_price.unwrap_or(0);
        let high = max_price.unwrap_or(u32::MAX);
        if low > high {
            return Err(SearchError::InvalidRequest(format!(
                "min_price ({}) must not exceed max_price ({})",
                low, high
            )));
        }

        let mut scored: Vec<(f64, &IndexedRestaurant, Vec<PricedMenu>)> = self
            .catalog
            .iter()
            .filter_map(|entry| {
                let in_range: Vec<PricedMenu> = entry
                    .restaurant
                    .menu
                    .iter()
                    .filter_map(|item| {
                        let price = item.numeric_price()?;
                        (low..=high).contains(&price).then(|| PricedMenu {
                            name: item.name.clone(),
                            price: item.price.clone(),
                            price_numeric: price,
                        })
                    })
                    .collect();

                if in_range.is_empty() {
                    return None;
                }
                let score = in_range.len() as f64;
                let shown = in_range.into_iter().take(MAX_PRICE_RANGE_MENUS).collect();
                Some((score, entry, shown))
            })
            .collect();

        let total = rank(&mut scored, limit);

        let results = scored
            .into_iter()
            .map(|(score, entry, price_range_menus)| PriceHit {
                name: entry.restaurant.name.clone(),
                category: entry.restaurant.category.clone(),
                score: round2(score),
                price_range_menus,
            })
            .collect();

        Ok(PriceResults {
            total,
            results,
            min_price,
            max_price,
        })
    }

    pub fn get_restaurant_details(
        &self,
        restaurant_name: &str,
    ) -> Result<RestaurantDetails, SearchError> {
        let (score, entry) = self.resolve(restaurant_name)?;
        let r = &entry.restaurant;

        Ok(RestaurantDetails {
            name: r.name.clone(),
            category: r.category.clone(),
            menu: r.menu.clone(),
            menu_count: r.menu.len(),
            images: r.images.clone(),
            restaurant_id: r.restaurant_id.clone(),
            indexed_at: r.indexed_at.clone(),
            score: round2(score),
        })
    }

    pub fn get_statistics(&self) -> Statistics {
        let total_restaurants = self.catalog.len();
        let total_menus: usize = self.catalog.iter().map(|e| e.restaurant.menu.len()).sum();

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for entry in self.catalog.iter() {
            let category = entry.restaurant.category.trim();
            let key = if category.is_empty() {
                UNCATEGORIZED
            } else {
                category
            };
            *categories.entry(key.to_string()).or_default() += 1;
        }

        let mut top_categories: Vec<(String, usize)> =
            categories.iter().map(|(k, v)| (k.clone(), *v)).collect();
        top_categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_categories.truncate(TOP_CATEGORIES);

        let average_menus_per_restaurant = if total_restaurants > 0 {
            (total_menus as f64 / total_restaurants as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        Statistics {
            total_restaurants,
            total_menus,
            average_menus_per_restaurant,
            categories,
            top_categories,
        }
    }

    /// Restaurants in the same category as `restaurant_name`, ranked by shared menu items.
    pub fn recommend_similar_restaurants(
        &self,
        restaurant_name: &str,
        limit: usize,
    ) -> Result<Recommendations, SearchError> {
        let (_, base) = self.resolve(restaurant_name)?;
        let base_menus: HashSet<&str> = base.menu_names.iter().map(String::as_str).collect();

        let mut scored: Vec<(f64, &IndexedRestaurant, usize)> = if base.category.is_empty() {
            Vec::new()
        } else {
            self.catalog
                .iter()
                .filter(|entry| {
                    entry.category == base.category
                        && entry.restaurant.restaurant_id != base.restaurant.restaurant_id
                        && entry.name_compact != base.name_compact
                })
                .map(|entry| {
                    let shared = entry
                        .menu_names
                        .iter()
                        .filter(|m| base_menus.contains(m.as_str()))
                        .count();
                    (shared as f64, entry, shared)
                })
                .collect()
        };

        rank(&mut scored, limit);

        let base_category = base.restaurant.category.clone();
        let recommendations: Vec<Recommendation> = scored
            .into_iter()
            .map(|(_, entry, shared)| Recommendation {
                name: entry.restaurant.name.clone(),
                category: entry.restaurant.category.clone(),
                similarity_reason: similarity_reason(&base_category, shared),
            })
            .collect();

        Ok(Recommendations {
            base_restaurant: base.restaurant.name.clone(),
            base_category,
            total: recommendations.len(),
            recommendations,
        })
    }

    /// Exact (whitespace-insensitive) name match first, otherwise the closest
    /// partial match.
    fn resolve(&self, restaurant_name: &str) -> Result<(f64, &IndexedRestaurant), SearchError> {
        let q = compact(restaurant_name);
        if q.is_empty() {
            return Err(SearchError::InvalidRequest(
                "restaurant_name must not be empty".to_string(),
            ));
        }

        if let Some(entry) = self.catalog.iter().find(|e| e.name_compact == q) {
            return Ok((10.0, entry));
        }

        let query_len = q.chars().count();
        self.catalog
            .iter()
            .filter(|e| e.name_compact.contains(&q) || q.contains(&e.name_compact))
            .map(|e| {
                let diff = e.name_compact.chars().count().abs_diff(query_len);
                ((5.0 - 0.1 * diff as f64).max(1.0), e)
            })
            .max_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.1.restaurant.name.cmp(&a.1.restaurant.name))
            })
            .ok_or_else(|| SearchError::NotFound(restaurant_name.to_string()))
    }
}

fn unified_score(entry: &IndexedRestaurant, q: &str, tokens: &[&str]) -> f64 {
    let mut score = 0.0;

    if entry.name == q {
        score += EXACT_NAME;
    }
    if entry.category == q {
        score += EXACT_CATEGORY;
    }
    if entry.name.contains(q) {
        score += NAME_CONTAINS;
    }
    if !entry.category.is_empty() && entry.category.contains(q) {
        score += CATEGORY_CONTAINS;
    }
    if entry.menu_names.iter().any(|m| m.contains(q)) {
        score += MENU_NAME_CONTAINS;
    }
    if entry.menu_descriptions.iter().any(|d| d.contains(q)) {
        score += MENU_DESCRIPTION_CONTAINS;
    }

    if tokens.len() > 1 {
        for token in tokens {
            if entry.name.contains(token) {
                score += TOKEN_NAME;
            }
            if entry.category.contains(token) {
                score += TOKEN_CATEGORY;
            }
            if entry.menu_names.iter().any(|m| m.contains(token)) {
                score += TOKEN_MENU;
            }
            if entry.full_text.contains(token) {
                score += TOKEN_FULL_TEXT;
            }
        }
    }

    score
}

fn similarity_reason(category: &str, shared: usize) -> String {
    match shared {
        0 => format!("same category ({})", category),
        1 => format!("same category ({}), 1 shared menu item", category),
        n => format!("same category ({}), {} shared menu items", category, n),
    }
}
