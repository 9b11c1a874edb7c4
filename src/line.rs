//! Card line cleanup: `"2 x Galaxy Foil Lightning Bolt (Showcase)"` -> `("Lightning Bolt", 2)`

use crate::error::ScrapeError;
use crate::rules::RuleSet;
use crate::types::VariantFlags;

/// A listing line reduced to its card name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLine {
    pub name: String,
    pub count: usize,
    pub flags: VariantFlags,
}

pub struct LineCleaner<'r> {
    rules: &'r RuleSet,
}

impl<'r> LineCleaner<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Parse a raw `<count> x <name>` line.
    ///
    /// Flags are read from the raw line since cleanup removes the very
    /// tokens that carry them.
    pub fn parse(&self, raw: &str) -> Result<CardLine, ScrapeError> {
        let (name, count) = self.clean(raw)?;
        Ok(CardLine {
            name,
            count,
            flags: VariantFlags::from_raw_line(raw),
        })
    }

    pub fn clean(&self, raw: &str) -> Result<(String, usize), ScrapeError> {
        let line = normalize_punctuation(raw);
        let (count, rest) = split_count(&line)?;

        let name = truncate_at(rest.trim(), "(");
        let name = drop_variant_prefix(name);
        let name = self.strip_decorations(name);
        let name = strip_credits(&name);
        let name = front_face(&name);
        let name = self.apply_corrections(&name);

        Ok((name.trim().to_string(), count))
    }

    pub fn strip_decorations(&self, name: &str) -> String {
        self.rules
            .decorations
            .iter()
            .fold(name.to_string(), |acc, d| d.strip(&acc))
    }

    pub fn apply_corrections(&self, name: &str) -> String {
        self.rules
            .name_corrections
            .iter()
            .fold(name.to_string(), |acc, r| acc.replace(&r.pattern, &r.replacement))
    }
}

pub fn normalize_punctuation(line: &str) -> String {
    line.replace('\u{a0}', " ")
        .replace('\u{2019}', "'")
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .trim()
        .to_string()
}

/// Split `"<count> x <rest>"`; the count must be a positive integer
fn split_count(line: &str) -> Result<(usize, &str), ScrapeError> {
    let (count, rest) = line
        .split_once("x ")
        .ok_or_else(|| ScrapeError::MalformedLine {
            line: line.to_string(),
        })?;

    let count = count.trim();
    match count.parse::<usize>() {
        Ok(n) if n >= 1 => Ok((n, rest)),
        _ => Err(ScrapeError::InvalidCount {
            line: line.to_string(),
            count: count.to_string(),
        }),
    }
}

fn truncate_at<'a>(text: &'a str, marker: &str) -> &'a str {
    match text.find(marker) {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Drop tags like "Galaxy Foil" that precede the card name
pub fn drop_variant_prefix(name: &str) -> &str {
    if !name.contains("Foil") || name.ends_with("Foil Edition") || name.ends_with("Foil Etched")
    {
        return name;
    }
    match name.split_once("Foil") {
        Some((_, after)) => after,
        None => name,
    }
}

/// Cut flavor names and artist credits
pub fn strip_credits(name: &str) -> String {
    [" as ", " by ", " with art"]
        .iter()
        .fold(name, |acc, marker| truncate_at(acc, marker))
        .to_string()
}

/// Keep only the front face of a double-faced card
pub fn front_face(name: &str) -> &str {
    if name.contains("//") && !name.contains(" // ") {
        return name.split("//").next().unwrap_or(name);
    }
    name.split(" // ").next().unwrap_or(name)
}
