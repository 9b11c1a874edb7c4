//! Decklist files and the review manifest

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::types::{NumberSource, Product};

/// Set code prefixed to every collector number
const SET_CODE: &str = "SLD";

/// Trait for types that render as a decklist
pub trait ToDecklist {
    fn to_decklist(&self) -> String;
}

impl ToDecklist for Product {
    fn to_decklist(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("// NAME: {}", self.title));
        lines.push(format!("// SOURCE: {}", self.source.uri));
        if let Some(date) = self.source.release_date {
            lines.push(format!("// DATE: {}", date.format("%Y-%m-%d")));
        }

        for card in self.cards() {
            let mut line = if card.has_number() {
                format!("1 [{SET_CODE}:{}] {}", card.number(), card.name)
            } else {
                format!("1 [{SET_CODE}] {}", card.name)
            };
            if card.flags.foil {
                line.push_str(" [foil]");
            }
            if card.flags.etched {
                line.push_str(" [etched]");
            }
            if card.flags.token {
                line.push_str(" [token]");
            }
            lines.push(line);
        }

        lines.join("\n") + "\n"
    }
}

/// Write `<filename>.txt` into `dir`
pub fn write_decklist(product: &Product, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    let path = dir.join(format!("{}.txt", product.filename));
    fs::write(&path, product.to_decklist())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// One manifest row per written product
#[derive(Debug, Serialize)]
pub struct ManifestRow<'a> {
    pub filename: &'a str,
    pub title: &'a str,
    pub source: &'a str,
    pub release_date: String,
    pub cards: usize,
    pub catalog: usize,
    pub recognized: usize,
    pub backfilled: usize,
    pub unresolved: usize,
}

impl<'a> ManifestRow<'a> {
    pub fn new(product: &'a Product) -> Self {
        Self {
            filename: &product.filename,
            title: &product.title,
            source: &product.source.uri,
            release_date: product
                .source
                .release_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            cards: product.len(),
            catalog: product.count_by_source(NumberSource::Catalog),
            recognized: product.count_by_source(NumberSource::Recognized),
            backfilled: product.count_by_source(NumberSource::Backfilled),
            unresolved: product.unresolved(),
        }
    }
}

/// CSV listing of products so unresolved numbers can be reviewed
pub struct Manifest {
    writer: csv::Writer<File>,
}

impl Manifest {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create manifest: {}", path.display()))?;
        Ok(Self { writer })
    }

    pub fn add(&mut self, product: &Product) -> Result<()> {
        self.writer.serialize(ManifestRow::new(product))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, VariantFlags};
    use chrono::NaiveDate;

    fn product() -> Product {
        let mut p = Product::new(
            "Drop: Heads I Win Foil Edition".to_string(),
            "Drop- Heads I Win Foil Edition".to_string(),
            Source::new(
                "https://secretlair.wizards.com/us/product/1",
                NaiveDate::from_ymd_opt(2024, 3, 4),
            ),
        );
        p.push_cards(
            "Lightning Bolt",
            VariantFlags {
                foil: true,
                etched: true,
                token: false,
            },
            1,
        );
        p.push_cards(
            "Goblin",
            VariantFlags {
                token: true,
                ..Default::default()
            },
            1,
        );
        p.card_at_mut(0)
            .unwrap()
            .assign_number("123", NumberSource::Catalog);
        p
    }

    #[test]
    fn test_decklist_format() {
        assert_eq!(
            product().to_decklist(),
            "// NAME: Drop: Heads I Win Foil Edition\n\
             // SOURCE: https://secretlair.wizards.com/us/product/1\n\
             // DATE: 2024-03-04\n\
             1 [SLD:123] Lightning Bolt [foil] [etched]\n\
             1 [SLD] Goblin [token]\n"
        );
    }

    #[test]
    fn test_decklist_without_date() {
        let mut p = product();
        p.source.release_date = None;
        assert!(!p.to_decklist().contains("// DATE"));
    }

    #[test]
    fn test_manifest_row_counts() {
        let p = product();
        let row = ManifestRow::new(&p);
        assert_eq!(row.cards, 2);
        assert_eq!(row.catalog, 1);
        assert_eq!(row.unresolved, 1);
        assert_eq!(row.release_date, "2024-03-04");
    }
}
