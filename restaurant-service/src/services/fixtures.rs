//! Shared test fixtures.

use crate::services::catalog::Catalog;

pub const SAMPLE_DATASET: &str = include_str!("../../data/restaurants.json");

pub fn sample_catalog() -> Catalog {
    Catalog::from_json(SAMPLE_DATASET).expect("sample dataset is valid")
}
