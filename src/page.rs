//! Secret Lair product page parsing

use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::fetch::HttpClient;
use crate::line::LineCleaner;
use crate::rules::RuleSet;
use crate::title::clean_title;
use crate::types::{Product, Source};

pub const STORE_URL: &str = "https://secretlair.wizards.com";

const TITLE_SELECTOR: &str = r#"h1[class="product-title"]"#;
const LIST_SELECTOR: &str = r#"div[class="force-overflow"] ul li"#;
const INFO_SELECTOR: &str =
    r#"div[id="collapse2"] div[class="force-overflow"] p[class="product-information"]"#;
const GALLERY_SELECTOR: &str = r#"h2[class="pdp_title"]"#;
const IMAGE_SELECTOR: &str = "figure a";

/// Retrieves product page HTML
pub trait PageFetcher {
    fn get_page(&self, uri: &str) -> Result<String, ScrapeError>;
}

impl PageFetcher for HttpClient {
    fn get_page(&self, uri: &str) -> Result<String, ScrapeError> {
        self.get_text(uri)
    }
}

/// The raw pieces of a product page
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub title: String,
    /// Bullet point card lines
    pub list_lines: Vec<String>,
    /// Card lines from the product information paragraph
    pub info_lines: Vec<String>,
    pub gallery_title: String,
    /// Image links in gallery order; `None` where an anchor had no href
    pub images: Vec<Option<String>>,
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Invalid selector {:?}: {}", css, e);
            None
        }
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>()
}

/// Split a paragraph at its `<br>` elements
fn lines_by_break(p: ElementRef) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for child in p.children() {
        match child.value() {
            Node::Element(el) if el.name() == "br" => {
                lines.push(std::mem::take(&mut current));
            }
            Node::Text(text) => current.push_str(text),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    current.push_str(&element_text(el));
                }
            }
            _ => {}
        }
    }
    lines.push(current);
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn absolute_link(href: &str) -> String {
    if href.starts_with('/') {
        format!("{STORE_URL}{href}")
    } else {
        href.to_string()
    }
}

pub fn parse_page(html: &str) -> ProductPage {
    let document = Html::parse_document(html);
    let mut page = ProductPage::default();

    if let Some(sel) = selector(TITLE_SELECTOR) {
        page.title = document
            .select(&sel)
            .map(element_text)
            .collect::<String>()
            .trim()
            .to_string();
    }
    if let Some(sel) = selector(LIST_SELECTOR) {
        page.list_lines = document.select(&sel).map(element_text).collect();
    }
    if let Some(sel) = selector(INFO_SELECTOR) {
        page.info_lines = document.select(&sel).flat_map(lines_by_break).collect();
    }
    if let Some(sel) = selector(GALLERY_SELECTOR) {
        page.gallery_title = document.select(&sel).map(element_text).collect();
    }
    if let Some(sel) = selector(IMAGE_SELECTOR) {
        page.images = document
            .select(&sel)
            .map(|a| a.value().attr("href").map(absolute_link))
            .collect();
    }

    page
}

/// Push the cards of every parseable line. Bad lines are logged and skipped.
fn push_lines(
    product: &mut Product,
    lines: &[String],
    cleaner: &LineCleaner,
    single_copy: bool,
    quiet: bool,
) -> Result<(), ScrapeError> {
    for line in lines {
        match cleaner.parse(line) {
            Ok(card) => {
                let count = if single_copy { 1 } else { card.count };
                debug!("'{}' x{}", card.name, count);
                product.push_cards(&card.name, card.flags, count);
            }
            Err(e) if e.is_line_error() => {
                if quiet {
                    debug!("Skipping {:?}: {}", line, e);
                } else {
                    warn!("{}: {}", product.title, e);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Build the product from its card lines.
///
/// Bullet points are tried first, then the information paragraph, which
/// also carries prose and so is parsed quietly.
pub fn build_product(
    page: &ProductPage,
    source: Source,
    rules: &RuleSet,
) -> Result<Product, ScrapeError> {
    let title = clean_title(&page.title, rules);
    info!("{}", title.display);

    let mut product = Product::new(title.display, title.filename, source);
    let single_copy = rules.is_single_copy(&page.title);
    let cleaner = LineCleaner::new(rules);

    push_lines(&mut product, &page.list_lines, &cleaner, single_copy, false)?;
    if product.is_empty() {
        push_lines(&mut product, &page.info_lines, &cleaner, single_copy, true)?;
    }

    if product.is_empty() {
        return Err(ScrapeError::NoItemsFound {
            title: product.title,
        });
    }
    Ok(product)
}
