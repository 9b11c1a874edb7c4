use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::matcher::{number_from_catalog, CatalogMatch};
use crate::ocr::{fill_from_images, is_fold_mode, NumberReader};
use crate::page::{build_product, parse_page, PageFetcher, ProductPage};
use crate::reconcile::{backfill, Backfill};
use crate::rules::RuleSet;
use crate::scryfall::{CardSearch, CatalogEntry};
use crate::types::{Product, Source};

/// Everything shared by the products of one run
pub struct Scraper<'a> {
    pub pages: &'a dyn PageFetcher,
    pub index: &'a [CatalogEntry],
    pub search: &'a dyn CardSearch,
    /// Image pass, when OCR is enabled
    pub reader: Option<&'a dyn NumberReader>,
    pub rules: &'a RuleSet,
}

impl Scraper<'_> {
    pub fn scrape(&self, source: Source) -> Result<Product, ScrapeError> {
        let html = self.pages.get_page(&source.uri)?;
        let page = parse_page(&html);
        let mut product = build_product(&page, source, self.rules)?;
        self.resolve_numbers(&mut product, &page);
        Ok(product)
    }

    /// Catalog first, then images, then arithmetic backfill
    pub fn resolve_numbers(&self, product: &mut Product, page: &ProductPage) {
        if let CatalogMatch::Matched { entry, numbered } =
            number_from_catalog(product, self.index, self.search, self.rules)
        {
            debug!("{}: {} cards numbered from {:?}", product.title, numbered, entry);
        }

        if let Some(reader) = self.reader {
            if !product.is_fully_numbered() {
                let fold = is_fold_mode(&page.gallery_title, product.len());
                if fold {
                    debug!("{}: fronts and backs alternate in gallery", product.title);
                }
                let pass = fill_from_images(product, &page.images, fold, reader);
                info!(
                    "{}: {} numbers read from images, {} images failed",
                    product.title, pass.recognized, pass.failed
                );
                if let Some(mismatch) = pass.mismatch {
                    debug!("{}: image pass stopped early: {}", product.title, mismatch);
                }
            }
        }

        if let Backfill::Filled { anchor, position, assigned } = backfill(product) {
            info!(
                "{}: backfilled {} numbers from {} at position {}",
                product.title, assigned, anchor, position
            );
        }
    }
}
