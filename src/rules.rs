//! Ordered rule tables for name and title cleanup
//!
//! Built-in defaults cover the known listing quirks. A CONL file can replace
//! any table; fields missing from the file keep their defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Literal `pattern` -> `replacement` substitution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

impl Rule {
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }
}

/// Decorative token stripped from card names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Decoration {
    pub token: String,
    /// Keep the token when the name contains any of these
    #[serde(default)]
    pub unless: Vec<String>,
}

impl Decoration {
    fn plain(token: &str) -> Self {
        Self {
            token: token.to_string(),
            unless: Vec::new(),
        }
    }

    /// Remove the token as written and in lowercase
    pub fn strip(&self, text: &str) -> String {
        if self.token.is_empty() || self.unless.iter().any(|w| text.contains(w.as_str())) {
            return text.to_string();
        }
        text.replace(&self.token, "")
            .replace(&self.token.to_lowercase(), "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    pub decorations: Vec<Decoration>,
    pub name_corrections: Vec<Rule>,
    pub title_substitutions: Vec<Rule>,
    /// Product line prefix dropped from titles
    pub product_prefix: String,
    /// Titles containing this keep the prefix
    pub prefix_keep_marker: String,
    pub title_abbreviations: Vec<Rule>,
    /// Cosmetic suffixes ignored when matching against the catalog
    pub match_suffixes: Vec<String>,
    /// Products that list every card once regardless of the count
    pub single_copy_titles: Vec<String>,
    /// Store listings never scraped
    pub skip_titles: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let phyrexian = Decoration {
            token: "Phyrexian".to_string(),
            unless: ["Tower", "Crusader", "Unlife"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        // Order matters: longer tokens must go before their substrings
        let mut decorations = vec![phyrexian];
        decorations.extend(
            [
                "Full-Text",
                "Full-Art",
                "Full-art",
                "Alt-Art",
                "Reversible",
                "Old Frame",
                "Retro Frame",
                "Poster",
                "Stained Glass",
                "Foil-etched",
                "Etched",
                "Foil",
                "Tokens",
                "Token",
                "Different",
                "Hand-Drawn",
                "Borderless",
                "Showcase",
                "Left-Handed",
                "Edition",
                "cards",
                "Japanese",
                "Regular Human Guy",
                "Ichor-E",
                "DFC",
                "Italian-language",
                "*",
            ]
            .iter()
            .map(|t| Decoration::plain(t)),
        );

        let title_substitutions = [
            ("\u{a0}", " "),
            ("\u{2019}", "'"),
            ("\u{2018}", "'"),
            ("®", ""),
            ("™", ""),
            ("<", ""),
            (">", ""),
            ("/", ""),
            ("\\", ""),
            ("*", ""),
            (" - ", " "),
            ("Regular", ""),
            ("DD ", ""),
            ("Secret Lair x ", ""),
            ("(English)", ""),
            ("English", ""),
            (" EN", ""),
            // Longest whitespace run first
            ("   ", " "),
            ("  ", " "),
        ]
        .iter()
        .map(|(p, r)| Rule::new(p, r))
        .collect();

        Self {
            decorations,
            name_corrections: vec![
                Rule::new("Sticker Sheets", "Sticker sheet"),
                Rule::new("Xenegos", "Xenagos"),
            ],
            title_substitutions,
            product_prefix: "Secret Lair ".to_string(),
            prefix_keep_marker: "High".to_string(),
            title_abbreviations: vec![Rule::new("S.P.E.C.I.A.L.", "SPECIAL")],
            match_suffixes: vec![
                " Foil Edition".to_string(),
                " Raised".to_string(),
                " Galaxy".to_string(),
            ],
            single_copy_titles: vec!["Astrology Lands".to_string()],
            skip_titles: [
                "Bundle",
                "BUNDLE",
                "Festival in a Box",
                "Transformers TCG",
                "DRAGON\u{2019}S ENDGAME",
                "Secret Lair Commander Deck",
                "They're Just Like Us but",
                "Heads I Win, Tails",
                "Deluxe Collection",
                "Heroes of the Borderlands",
                "Welcome to the Hellfire Club",
                "D&D Sapphire Anniversary",
                "30th Anniversary Edition",
                "Japanese",
                " JP",
                " SP",
                "Countdown Kit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RuleSet {
    /// Load rules from a CONL file, falling back to defaults per field
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        Self::from_conl(&content)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))
    }

    pub fn from_conl(content: &str) -> Result<Self> {
        Ok(serde_conl::from_str(content)?)
    }

    pub fn is_single_copy(&self, title: &str) -> bool {
        self.single_copy_titles
            .iter()
            .any(|t| title.contains(t.as_str()))
    }

    pub fn should_skip(&self, title: &str) -> bool {
        self.skip_titles.iter().any(|t| title.contains(t.as_str()))
    }
}

/// Apply rules in a single left-to-right pass.
///
/// At each position the first rule (in table order) whose pattern matches
/// wins; replaced text is never rescanned.
pub fn replace_single_pass(text: &str, rules: &[Rule]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'outer: while !rest.is_empty() {
        for rule in rules {
            if !rule.pattern.is_empty() && rest.starts_with(rule.pattern.as_str()) {
                out.push_str(&rule.replacement);
                rest = &rest[rule.pattern.len()..];
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
