//! Product and card types shared by the parsing and numbering passes

use chrono::NaiveDate;

/// Where a card's collector number came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberSource {
    Catalog,
    Recognized,
    Backfilled,
}

/// Variant tags, derived from the raw listing line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantFlags {
    pub foil: bool,
    pub etched: bool,
    pub token: bool,
}

impl VariantFlags {
    pub fn from_raw_line(line: &str) -> Self {
        let lower = line.to_lowercase();
        Self {
            foil: lower.contains("foil"),
            etched: lower.contains("etched"),
            token: lower.contains("token"),
        }
    }
}

/// One physical card of a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Declaration order on the page, fixed at creation
    pub position: usize,
    pub name: String,
    pub flags: VariantFlags,
    number: String,
    source: Option<NumberSource>,
}

impl Card {
    pub fn new(position: usize, name: impl Into<String>, flags: VariantFlags) -> Self {
        Self {
            position,
            name: name.into(),
            flags,
            number: String::new(),
            source: None,
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn source(&self) -> Option<NumberSource> {
        self.source
    }

    pub fn has_number(&self) -> bool {
        !self.number.is_empty()
    }

    /// Set the number if none is present yet. Returns whether it was set.
    pub fn assign_number(&mut self, number: &str, source: NumberSource) -> bool {
        if self.has_number() || number.is_empty() {
            return false;
        }
        self.number = number.to_string();
        self.source = Some(source);
        true
    }

    /// Replace the number with a backfilled one, unless the catalog owns it
    pub fn backfill_number(&mut self, number: String) -> bool {
        if self.source == Some(NumberSource::Catalog) {
            return false;
        }
        self.number = number;
        self.source = Some(NumberSource::Backfilled);
        true
    }
}

/// Where a product page came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub uri: String,
    pub release_date: Option<NaiveDate>,
}

impl Source {
    pub fn new(uri: impl Into<String>, release_date: Option<NaiveDate>) -> Self {
        Self {
            uri: uri.into(),
            release_date,
        }
    }
}

/// One scraped product page with its cards in page order
#[derive(Debug, Clone)]
pub struct Product {
    pub title: String,
    pub filename: String,
    pub source: Source,
    cards: Vec<Card>,
}

impl Product {
    pub fn new(title: String, filename: String, source: Source) -> Self {
        Self {
            title,
            filename,
            source,
            cards: Vec::new(),
        }
    }

    /// Append `count` copies of a card, each with the next position
    pub fn push_cards(&mut self, name: &str, flags: VariantFlags, count: usize) {
        for _ in 0..count {
            let position = self.cards.len();
            self.cards.push(Card::new(position, name, flags));
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    pub fn card_at_mut(&mut self, position: usize) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.position == position)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn unresolved(&self) -> usize {
        self.cards.iter().filter(|c| !c.has_number()).count()
    }

    pub fn is_fully_numbered(&self) -> bool {
        self.unresolved() == 0
    }

    pub fn count_by_source(&self, source: NumberSource) -> usize {
        self.cards
            .iter()
            .filter(|c| c.source() == Some(source))
            .count()
    }
}
