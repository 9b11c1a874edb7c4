//! Scryfall access: the Secret Lair set index and card searches

use std::collections::HashMap;

use reqwest::Url;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::fetch::HttpClient;

pub const SET_URL: &str = "https://scryfall.com/sets/sld";
const SEARCH_URL: &str = "https://api.scryfall.com/cards/search";
const HEADER_SELECTOR: &str = ".card-grid-header-content";

/// Promo type of bonus cards, which are tracked elsewhere
const BONUS_PROMO: &str = "sldbonus";
/// Marker of older foil-only duplicates
const FOIL_DUPLICATE_MARKER: char = '★';

/// One drop listed on the set page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub uri: String,
}

impl CatalogEntry {
    /// The search query stored in the entry link
    pub fn query(&self) -> Option<String> {
        let url = Url::parse(SET_URL).ok()?.join(&self.uri).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
    }
}

pub fn load_index(client: &HttpClient) -> Result<Vec<CatalogEntry>, ScrapeError> {
    let html = client.get_text(SET_URL)?;
    let entries = parse_index(&html);
    info!("Loaded {} drops from {}", entries.len(), SET_URL);
    Ok(entries)
}

pub fn parse_index(html: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    let (Ok(header), Ok(link)) = (Selector::parse(HEADER_SELECTOR), Selector::parse("a")) else {
        return Vec::new();
    };

    document
        .select(&header)
        .map(|el| {
            let text: String = el.text().collect();
            let title = text.split('•').next().unwrap_or("").trim().to_string();
            let uri = el
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or("")
                .to_string();
            CatalogEntry { title, uri }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardFace {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardRecord {
    pub name: String,
    pub collector_number: String,
    #[serde(default)]
    pub card_faces: Vec<CardFace>,
    #[serde(default)]
    pub type_line: String,
    #[serde(default)]
    pub promo_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    data: Vec<CardRecord>,
    #[serde(default)]
    has_more: bool,
    next_page: Option<String>,
}

/// Card search against the authoritative catalog
pub trait CardSearch {
    fn search(&self, query: &str) -> Result<Vec<CardRecord>, ScrapeError>;
}

pub struct ScryfallClient<'a> {
    client: &'a HttpClient,
}

impl<'a> ScryfallClient<'a> {
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }
}

impl CardSearch for ScryfallClient<'_> {
    /// All printings in set order, extras included, across every result page
    fn search(&self, query: &str) -> Result<Vec<CardRecord>, ScrapeError> {
        let first = Url::parse_with_params(
            SEARCH_URL,
            &[
                ("q", query),
                ("unique", "prints"),
                ("order", "set"),
                ("dir", "asc"),
                ("include_extras", "true"),
            ],
        )
        .map_err(|e| ScrapeError::fetch(SEARCH_URL, e))?;

        let mut cards = Vec::new();
        let mut next = Some(first.to_string());
        while let Some(url) = next.take() {
            let page: SearchPage = self.client.get_json(&url)?;
            debug!("{} cards from {}", page.data.len(), url);
            cards.extend(page.data);
            if page.has_more {
                next = page.next_page;
            }
        }
        Ok(cards)
    }
}

/// Map card names to collector numbers.
///
/// Bonus cards and star-suffixed foil duplicates are left out. Double-faced
/// cards are keyed by their front face and numbered with an `a` suffix.
pub fn name_map(records: &[CardRecord]) -> HashMap<String, String> {
    let mut numbers = HashMap::new();
    for card in records {
        if card.promo_types.iter().any(|p| p == BONUS_PROMO) {
            continue;
        }
        if card.collector_number.ends_with(FOIL_DUPLICATE_MARKER) {
            continue;
        }

        let name = match card.card_faces.first() {
            Some(face) => face.name.as_str(),
            None => card.name.split(" // ").next().unwrap_or(&card.name),
        };
        let mut number = card.collector_number.clone();
        if !card.card_faces.is_empty() {
            number.push('a');
        }

        if card.type_line.contains("Token") {
            debug!("{} ({}) is a token", name, number);
        }
        numbers.entry(name.to_string()).or_insert(number);
    }
    numbers
}
