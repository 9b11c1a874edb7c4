use tracing::{info, warn};

use crate::types::Product;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backfill {
    /// Every card already had a number
    Complete,
    /// Nothing to extrapolate from
    NoAnchor,
    /// The anchor did not parse as a positive integer
    InvalidAnchor(String),
    Filled {
        anchor: u64,
        position: usize,
        assigned: usize,
    },
}

/// Derive missing collector numbers from the longest number found so far.
///
/// Assumes the whole product is one contiguous ascending run: every card not
/// numbered by the catalog gets `anchor + (position - anchor position)`.
pub fn backfill(product: &mut Product) -> Backfill {
    if product.is_fully_numbered() {
        return Backfill::Complete;
    }
    info!("{}: couldn't number every card, trying to backfill", product.title);

    // Most digits recognized is the most trustworthy; first one on ties
    let mut anchor: Option<(&str, usize)> = None;
    for card in product.cards() {
        if card.has_number() && anchor.map_or(true, |(n, _)| card.number().len() > n.len()) {
            anchor = Some((card.number(), card.position));
        }
    }

    let Some((number, position)) = anchor else {
        warn!("{}: no numbers found, nothing to backfill from", product.title);
        return Backfill::NoAnchor;
    };

    let value = match number.trim_start_matches('0').parse::<u64>() {
        Ok(v) if v > 0 => v,
        _ => {
            let number = number.to_string();
            warn!("{}: cannot backfill from {:?}", product.title, number);
            return Backfill::InvalidAnchor(number);
        }
    };

    let mut assigned = 0;
    for card in product.cards_mut() {
        let Some(n) = value
            .checked_add(card.position as u64)
            .and_then(|v| v.checked_sub(position as u64))
        else {
            continue;
        };
        if card.backfill_number(n.to_string()) {
            assigned += 1;
        }
    }

    Backfill::Filled {
        anchor: value,
        position,
        assigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NumberSource, Source, VariantFlags};

    fn product(numbers: &[&str]) -> Product {
        let mut p = Product::new(
            "Drop".to_string(),
            "Drop".to_string(),
            Source::new("https://example.com", None),
        );
        for (i, number) in numbers.iter().enumerate() {
            p.push_cards(&format!("Card {i}"), VariantFlags::default(), 1);
            p.card_at_mut(i)
                .unwrap()
                .assign_number(number, NumberSource::Recognized);
        }
        p
    }

    fn numbers(p: &Product) -> Vec<&str> {
        p.cards().iter().map(|c| c.number()).collect()
    }

    #[test]
    fn test_backfill_around_anchor() {
        let mut p = product(&["", "012", ""]);
        let result = backfill(&mut p);
        assert_eq!(numbers(&p), vec!["11", "12", "13"]);
        assert_eq!(
            result,
            Backfill::Filled {
                anchor: 12,
                position: 1,
                assigned: 3
            }
        );
    }

    #[test]
    fn test_longest_number_is_anchor() {
        let mut p = product(&["7", "", "0102", "", "12"]);
        backfill(&mut p);
        assert_eq!(numbers(&p), vec!["100", "101", "102", "103", "104"]);
    }

    #[test]
    fn test_first_anchor_wins_ties() {
        let mut p = product(&["", "500", "900"]);
        backfill(&mut p);
        assert_eq!(numbers(&p), vec!["499", "500", "501"]);
    }

    #[test]
    fn test_no_numbers_leaves_cards_empty() {
        let mut p = product(&["", "", ""]);
        assert_eq!(backfill(&mut p), Backfill::NoAnchor);
        assert_eq!(numbers(&p), vec!["", "", ""]);
    }

    #[test]
    fn test_complete_product_is_untouched() {
        let mut p = product(&["0001", "0002"]);
        assert_eq!(backfill(&mut p), Backfill::Complete);
        assert_eq!(numbers(&p), vec!["0001", "0002"]);
    }

    #[test]
    fn test_zero_anchor_aborts() {
        let mut p = product(&["000", ""]);
        assert_eq!(backfill(&mut p), Backfill::InvalidAnchor("000".to_string()));
        assert_eq!(numbers(&p), vec!["000", ""]);
    }

    #[test]
    fn test_catalog_numbers_are_kept() {
        let mut p = product(&["", "", ""]);
        p.card_at_mut(0)
            .unwrap()
            .assign_number("7", NumberSource::Catalog);
        p.card_at_mut(1)
            .unwrap()
            .assign_number("0051", NumberSource::Recognized);
        backfill(&mut p);
        assert_eq!(numbers(&p), vec!["7", "51", "52"]);
    }

    #[test]
    fn test_face_suffixed_anchor_aborts() {
        let mut p = product(&["", ""]);
        p.card_at_mut(0)
            .unwrap()
            .assign_number("350a", NumberSource::Catalog);
        assert_eq!(backfill(&mut p), Backfill::InvalidAnchor("350a".to_string()));
        assert_eq!(numbers(&p), vec!["350a", ""]);
    }

    #[test]
    fn test_huge_anchor_does_not_overflow() {
        let mut p = product(&["18446744073709551615", "", ""]);
        let result = backfill(&mut p);
        assert_eq!(numbers(&p), vec!["18446744073709551615", "", ""]);
        assert_eq!(
            result,
            Backfill::Filled {
                anchor: u64::MAX,
                position: 0,
                assigned: 1
            }
        );
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let mut p = product(&["", "", "", "0042", "", ""]);
        backfill(&mut p);
        let values: Vec<u64> = p.cards().iter().map(|c| c.number().parse().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values[3], 42);
    }
}
