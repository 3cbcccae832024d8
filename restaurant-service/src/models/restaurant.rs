//! Restaurant records as they appear in the static dataset.

use serde::{Deserialize, Deserializer, Serialize};

/// A single restaurant in the neighborhood dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    /// Stable identifier. Derived from the record position when the file omits it.
    #[serde(default)]
    pub restaurant_id: String,

    pub name: String,

    /// Free-form category label (e.g. `중식당`, `카페`).
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub menu: Vec<MenuItem>,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

/// A menu entry. Prices are kept both as the display string and as a number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub name: String,

    #[serde(
        default,
        deserialize_with = "display_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_numeric: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MenuItem {
    /// Numeric price in won, falling back to parsing the display string.
    pub fn numeric_price(&self) -> Option<u32> {
        self.price_numeric
            .or_else(|| self.price.as_deref().and_then(parse_price))
    }
}

/// Accept `"12,000원"` as well as a bare number, which is rendered as `"12000"`.
fn display_price<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Text(String),
        Number(u64),
    }

    Ok(Option::<RawPrice>::deserialize(deserializer)?.map(|raw| match raw {
        RawPrice::Text(text) => text,
        RawPrice::Number(n) => n.to_string(),
    }))
}

/// Extract the won amount from a display price such as `"12,000원"`.
///
/// Only the first run of digits (commas allowed inside it) counts, so
/// `"9,000원 ~ 12,000원"` yields 9000.
pub fn parse_price(price: &str) -> Option<u32> {
    let digits: String = price
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
