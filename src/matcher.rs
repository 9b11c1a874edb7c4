//! Title lookup against the catalog index and number assignment from the hit

use tracing::{info, warn};

use crate::rules::RuleSet;
use crate::scryfall::{name_map, CardSearch, CatalogEntry};
use crate::title::match_title;
use crate::types::{NumberSource, Product};

/// Whether every character of `needle` appears in `haystack`, in order
pub fn fuzzy_match(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle.chars().all(|c| hay.any(|h| h == c))
}

/// Case-insensitive fuzzy or substring match in either direction
pub fn titles_match(title: &str, entry_title: &str) -> bool {
    let a = title.to_lowercase();
    let b = entry_title.to_lowercase();
    fuzzy_match(&a, &b) || a.contains(&b) || b.contains(&a)
}

/// Outcome of the catalog pass for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogMatch {
    Matched { entry: String, numbered: usize },
    NotFound,
}

/// Number cards from the first catalog entry whose title matches.
///
/// A failed search only rules out that entry; the next match is tried.
pub fn number_from_catalog(
    product: &mut Product,
    index: &[CatalogEntry],
    search: &dyn CardSearch,
    rules: &RuleSet,
) -> CatalogMatch {
    let title = match_title(&product.title, rules);

    for entry in index.iter().filter(|e| titles_match(&title, &e.title)) {
        let Some(query) = entry.query() else {
            warn!("{}: no query in {:?}", entry.title, entry.uri);
            continue;
        };

        let records = match search.search(&query) {
            Ok(records) => records,
            Err(e) => {
                warn!("{}: {}", product.title, e);
                continue;
            }
        };

        let numbers = name_map(&records);
        info!("{}: matched {:?}, {} possible numbers", product.title, entry.title, numbers.len());

        let mut numbered = 0;
        for card in product.cards_mut() {
            if let Some(number) = numbers.get(&card.name) {
                if card.assign_number(number, NumberSource::Catalog) {
                    numbered += 1;
                }
            }
        }
        return CatalogMatch::Matched {
            entry: entry.title.clone(),
            numbered,
        };
    }

    warn!("{} was not found, no numbers available!", title);
    CatalogMatch::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::scryfall::CardRecord;
    use crate::types::{Source, VariantFlags};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct StubSearch {
        results: HashMap<String, Vec<CardRecord>>,
        queries: RefCell<Vec<String>>,
    }

    impl StubSearch {
        fn new(results: &[(&str, Vec<CardRecord>)]) -> Self {
            Self {
                results: results
                    .iter()
                    .map(|(q, r)| (q.to_string(), r.clone()))
                    .collect(),
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl CardSearch for StubSearch {
        fn search(&self, query: &str) -> Result<Vec<CardRecord>, ScrapeError> {
            self.queries.borrow_mut().push(query.to_string());
            self.results
                .get(query)
                .cloned()
                .ok_or_else(|| ScrapeError::fetch(query, "404 Not Found"))
        }
    }

    fn record(name: &str, number: &str, promo: &[&str]) -> CardRecord {
        CardRecord {
            name: name.to_string(),
            collector_number: number.to_string(),
            card_faces: Vec::new(),
            type_line: String::new(),
            promo_types: promo.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn entry(title: &str, query: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            uri: format!("/search?q={query}"),
        }
    }

    fn product(title: &str, names: &[&str]) -> Product {
        let mut p = Product::new(
            title.to_string(),
            title.to_string(),
            Source::new("https://example.com", None),
        );
        for name in names {
            p.push_cards(name, VariantFlags::default(), 1);
        }
        p
    }

    #[test]
    fn test_fuzzy_match_is_subsequence() {
        assert!(fuzzy_match("hdsiwn", "heads i win"));
        assert!(fuzzy_match("", "anything"));
        assert!(!fuzzy_match("win heads", "heads i win"));
    }

    #[test]
    fn test_titles_match() {
        assert!(titles_match("Heads I Win", "heads i win, tails you lose"));
        assert!(titles_match("Drop: Heads I Win", "Heads I Win"));
        assert!(!titles_match("Bob Ross", "Heads I Win"));
    }

    #[test]
    fn test_numbers_assigned_from_first_match() {
        let index = vec![
            entry("Bob Ross", "bob"),
            entry("Heads I Win", "heads"),
            entry("Heads I Win Again", "again"),
        ];
        let search = StubSearch::new(&[
            (
                "heads",
                vec![
                    record("Lightning Bolt", "900", &["sldbonus"]),
                    record("Counterspell", "101", &[]),
                ],
            ),
            ("again", vec![record("Counterspell", "555", &[])]),
        ]);
        let mut p = product("Heads I Win Foil Edition", &["Counterspell", "Lightning Bolt"]);

        let result = number_from_catalog(&mut p, &index, &search, &RuleSet::default());

        assert_eq!(
            result,
            CatalogMatch::Matched {
                entry: "Heads I Win".to_string(),
                numbered: 1
            }
        );
        assert_eq!(p.cards()[0].number(), "101");
        assert_eq!(p.cards()[1].number(), "");
        assert_eq!(*search.queries.borrow(), vec!["heads".to_string()]);
    }

    #[test]
    fn test_failed_search_tries_next_entry() {
        let index = vec![entry("Heads I Win", "broken"), entry("Heads I Win", "heads")];
        let search = StubSearch::new(&[("heads", vec![record("Counterspell", "101", &[])])]);
        let mut p = product("Heads I Win", &["Counterspell"]);

        number_from_catalog(&mut p, &index, &search, &RuleSet::default());

        assert_eq!(p.cards()[0].number(), "101");
    }

    #[test]
    fn test_no_match_numbers_nothing() {
        let index = vec![entry("Bob Ross", "bob")];
        let search = StubSearch::new(&[]);
        let mut p = product("Heads I Win", &["Counterspell"]);

        let result = number_from_catalog(&mut p, &index, &search, &RuleSet::default());

        assert_eq!(result, CatalogMatch::NotFound);
        assert!(search.queries.borrow().is_empty());
        assert_eq!(p.unresolved(), 1);
    }
}
