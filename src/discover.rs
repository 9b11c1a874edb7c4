//! Store search crawl listing every Secret Lair product, newest releases last

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::error::ScrapeError;
use crate::fetch::HttpClient;
use crate::page::STORE_URL;
use crate::rules::RuleSet;

pub const PAGE_SIZE: usize = 50;
const STORE_SEARCH_URL: &str = "https://storesearch.eu.scalefast.com/StoreSearch?userID=10751401&locale=en_US&currency=USD&crit=ALL&sort=release_date&count=50&env=prod&offset=";

#[derive(Debug, Deserialize)]
pub struct StoreSearchResponse {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub products: Vec<StoreProduct>,
}

#[derive(Debug, Deserialize)]
pub struct StoreProduct {
    #[serde(rename = "productID")]
    pub product_id: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
}

#[derive(Debug, Deserialize)]
pub struct Description {
    pub title: String,
}

impl StoreProduct {
    pub fn url(&self) -> String {
        format!("{STORE_URL}/us/product/{}", self.product_id)
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        let raw = self.release_date.as_deref()?;
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.date_naive());
        }
        NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
    }

    /// Listings matching the skip list, such as bundles, are never scraped
    pub fn is_skipped(&self, rules: &RuleSet) -> bool {
        self.descriptions.iter().any(|d| rules.should_skip(&d.title))
    }

    pub fn display_title(&self) -> &str {
        self.descriptions
            .first()
            .map(|d| d.title.as_str())
            .unwrap_or(self.product_id.as_str())
    }
}

/// One page of the store listing, `page` counted from zero
pub fn fetch_page(client: &HttpClient, page: usize) -> Result<StoreSearchResponse, ScrapeError> {
    client.get_json(&format!("{STORE_SEARCH_URL}{}", page * PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "count": 2,
        "total": 420,
        "products": [
            {
                "productID": "5555",
                "release_date": "2024-03-04T17:00:00Z",
                "descriptions": [{"lang": "en", "title": "Secret Lair Drop: Heads I Win"}]
            },
            {
                "productID": "6666",
                "release_date": "2024-03-04T17:00:00+02:00",
                "descriptions": [{"lang": "en", "title": "Secret Lair Winter Bundle"}]
            }
        ]
    }"#;

    #[test]
    fn test_parse_response() {
        let resp: StoreSearchResponse = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(resp.total, 420);
        assert_eq!(resp.products.len(), 2);

        let first = &resp.products[0];
        assert_eq!(first.url(), "https://secretlair.wizards.com/us/product/5555");
        assert_eq!(first.release_date(), NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(first.display_title(), "Secret Lair Drop: Heads I Win");
    }

    #[test]
    fn test_skip_list() {
        let resp: StoreSearchResponse = serde_json::from_str(RESPONSE).unwrap();
        let rules = RuleSet::default();
        assert!(!resp.products[0].is_skipped(&rules));
        assert!(resp.products[1].is_skipped(&rules));
    }

    #[test]
    fn test_release_date_fallbacks() {
        let mut product = StoreProduct {
            product_id: "1".to_string(),
            release_date: Some("2023-11-20 00:00:00".to_string()),
            descriptions: Vec::new(),
        };
        assert_eq!(product.release_date(), NaiveDate::from_ymd_opt(2023, 11, 20));
        assert_eq!(product.display_title(), "1");

        product.release_date = Some("soon".to_string());
        assert_eq!(product.release_date(), None);
    }
}
