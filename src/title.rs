use crate::rules::{replace_single_pass, RuleSet};

const FOIL_EDITION: &str = "Foil Edition";

/// Display name and file-system safe name of a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTitle {
    pub filename: String,
    /// Upstream name with as few modifications as possible
    pub display: String,
}

pub fn clean_title(raw: &str, rules: &RuleSet) -> ProductTitle {
    let mut title = raw.to_string();

    // Pipe suffixes are metadata, except the foil marker
    if title.contains('|') {
        let head = title.split(" | ").next().unwrap_or(&title).to_string();
        title = if raw.ends_with(FOIL_EDITION) {
            format!("{head} {FOIL_EDITION}")
        } else {
            head
        };
    }

    title = replace_single_pass(&title, &rules.title_substitutions);

    if !rules.product_prefix.is_empty() && !title.contains(rules.prefix_keep_marker.as_str()) {
        title = title.replacen(rules.product_prefix.as_str(), "", 1);
    }

    for abbreviation in &rules.title_abbreviations {
        title = title.replacen(abbreviation.pattern.as_str(), &abbreviation.replacement, 1);
    }

    if title.ends_with("Foil") {
        title.push_str(" Edition");
    }

    let display = title.trim().to_string();
    let filename = display.replace(':', "-").trim().to_string();

    ProductTitle { filename, display }
}

/// Title used to look a product up in the catalog
pub fn match_title(display: &str, rules: &RuleSet) -> String {
    rules
        .match_suffixes
        .iter()
        .fold(display.to_string(), |acc, suffix| acc.replace(suffix.as_str(), ""))
}
