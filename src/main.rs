use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

mod discover;
mod error;
mod fetch;
mod line;
mod matcher;
mod ocr;
mod output;
mod page;
mod pipeline;
mod reconcile;
mod rules;
mod scryfall;
mod title;
mod types;
mod utils;

use crate::fetch::{HttpClient, DEFAULT_RETRIES};
use crate::ocr::{NumberReader, OcrReader, Tesseract};
use crate::output::{write_decklist, Manifest};
use crate::pipeline::Scraper;
use crate::rules::RuleSet;
use crate::scryfall::ScryfallClient;
use crate::types::{Product, Source};
use crate::utils::{osc8_file_link, osc8_link};

#[derive(Parser)]
#[command(name = "sld-decklists")]
#[command(about = "Secret Lair decklist scraper with collector number lookup")]
struct Cli {
    /// Product pages to scrape instead of crawling the store
    #[arg(value_name = "URL")]
    urls: Vec<String>,
    /// Store listing page to start crawling from
    #[arg(short, long)]
    page: Option<usize>,
    /// Read missing collector numbers off card images
    #[arg(long)]
    ocr: bool,
    /// Tesseract binary used by --ocr
    #[arg(long, default_value = "tesseract")]
    tesseract: PathBuf,
    /// Directory receiving the decklist files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// CONL file overriding the cleanup rules
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Cache fetched pages and images here
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Write a CSV review manifest
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Retries per request on network errors, 429 and 5xx
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,
}

/// Where finished products go
struct Sink<'a> {
    dir: &'a Path,
    manifest: Option<Manifest>,
    written: Vec<(PathBuf, String)>,
}

impl<'a> Sink<'a> {
    fn new(dir: &'a Path, manifest: Option<&Path>) -> Result<Self> {
        let manifest = manifest.map(Manifest::create).transpose()?;
        Ok(Self {
            dir,
            manifest,
            written: Vec::new(),
        })
    }

    fn save(&mut self, product: &Product) -> Result<()> {
        let path = write_decklist(product, self.dir)?;
        if let Some(manifest) = self.manifest.as_mut() {
            manifest.add(product)?;
        }
        let date = product
            .source
            .release_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        info!("Created '{}' ({})", path.display(), date);
        if product.unresolved() > 0 {
            warn!(
                "{}: {} of {} cards need a manual collector number",
                product.title,
                product.unresolved(),
                product.len()
            );
        }
        self.written.push((path, product.source.uri.clone()));
        Ok(())
    }

    fn print_summary(&self) {
        if self.written.is_empty() {
            return;
        }
        println!();
        println!("Wrote {} decklists:", self.written.len());
        for (path, uri) in &self.written {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            println!("  {} ({})", osc8_file_link(path, &name), osc8_link(uri, "source"));
        }
    }
}

fn scrape_urls(scraper: &Scraper, sink: &mut Sink, urls: &[String]) -> usize {
    let mut failed = 0;
    for (i, url) in urls.iter().enumerate() {
        let result = scraper
            .scrape(Source::new(url.as_str(), None))
            .map_err(anyhow::Error::from)
            .and_then(|product| sink.save(&product));
        if let Err(e) = result {
            error!("page {} - {}: {:#}", i, url, e);
            failed += 1;
        }
    }
    failed
}

/// Walk the store listing from `start` until an empty page.
/// Returns the page to resume from next time.
fn crawl(client: &HttpClient, scraper: &Scraper, sink: &mut Sink, start: usize) -> usize {
    let mut page = start;
    loop {
        let response = match discover::fetch_page(client, page) {
            Ok(r) => r,
            Err(e) => {
                error!("{}", e);
                break;
            }
        };
        page += 1;

        if response.products.is_empty() {
            break;
        }
        info!(
            "Listing page {}: {} products ({} total)",
            page - 1,
            response.products.len(),
            response.total
        );

        for product in &response.products {
            if product.is_skipped(scraper.rules) {
                info!("Skipping {}", product.display_title());
                continue;
            }

            let source = Source::new(product.url(), product.release_date());
            let result = scraper
                .scrape(source)
                .map_err(anyhow::Error::from)
                .and_then(|product| sink.save(&product));
            if let Err(e) = result {
                error!("page {} - {}: {:#}", page - 1, product.url(), e);
            }
        }
    }

    page.saturating_sub(2).max(1)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let rules = match &cli.rules {
        Some(path) => RuleSet::load_from_path(path)?,
        None => RuleSet::default(),
    };

    let start = cli.page.unwrap_or(0);
    if cli.urls.is_empty() && start == 0 {
        bail!("Missing starting --page argument");
    }

    let client = HttpClient::new(cli.cache_dir.clone(), cli.retries)?;
    let index = scryfall::load_index(&client).context("Unable to query scryfall")?;
    let search = ScryfallClient::new(&client);
    let ocr = OcrReader::new(&client, Tesseract::new(&cli.tesseract));
    let reader: Option<&dyn NumberReader> = if cli.ocr { Some(&ocr) } else { None };

    let scraper = Scraper {
        pages: &client,
        index: &index,
        search: &search,
        reader,
        rules: &rules,
    };
    let mut sink = Sink::new(&cli.output_dir, cli.manifest.as_deref())?;

    if !cli.urls.is_empty() {
        let failed = scrape_urls(&scraper, &mut sink, &cli.urls);
        sink.print_summary();
        return Ok(if failed > 0 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let resume = crawl(&client, &scraper, &mut sink, start);
    sink.print_summary();
    println!("In the future you can start from page {}", resume);
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::page::PageFetcher;
    use crate::scryfall::{CardRecord, CardSearch};
    use clap::CommandFactory;
    use std::collections::HashMap;
    use std::fs;

    const PAGE: &str = r#"
        <html><body>
          <h1 class="product-title">Secret Lair Drop: Heads I Win</h1>
          <div class="force-overflow"><ul><li>1 x Counterspell</li></ul></div>
        </body></html>"#;

    struct Pages(HashMap<&'static str, &'static str>);

    impl PageFetcher for Pages {
        fn get_page(&self, uri: &str) -> Result<String, ScrapeError> {
            self.0
                .get(uri)
                .map(|html| html.to_string())
                .ok_or_else(|| ScrapeError::fetch(uri, "connection reset"))
        }
    }

    struct EmptyCatalog;

    impl CardSearch for EmptyCatalog {
        fn search(&self, _query: &str) -> Result<Vec<CardRecord>, ScrapeError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sld-decklists", "--page", "3", "--ocr"]);
        assert_eq!(cli.page, Some(3));
        assert!(cli.ocr);
        assert!(cli.urls.is_empty());
        assert_eq!(cli.tesseract, PathBuf::from("tesseract"));
        assert_eq!(cli.retries, DEFAULT_RETRIES);
    }

    #[test]
    fn test_cli_urls() {
        let cli = Cli::parse_from([
            "sld-decklists",
            "https://secretlair.wizards.com/us/product/1",
            "-o",
            "out",
        ]);
        assert_eq!(cli.urls.len(), 1);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_failed_product_does_not_stop_run() {
        let dir = std::env::temp_dir().join(format!("sld-decklists-{}", std::process::id()));
        let pages = Pages(HashMap::from([("https://example.com/good", PAGE)]));
        let rules = RuleSet::default();
        let scraper = Scraper {
            pages: &pages,
            index: &[],
            search: &EmptyCatalog,
            reader: None,
            rules: &rules,
        };
        let mut sink = Sink::new(&dir, None).unwrap();
        let urls = vec![
            "https://example.com/broken".to_string(),
            "https://example.com/good".to_string(),
        ];

        let failed = scrape_urls(&scraper, &mut sink, &urls);

        assert_eq!(failed, 1);
        assert_eq!(sink.written.len(), 1);
        assert_eq!(sink.written[0].1, "https://example.com/good");
        assert!(dir.join("Drop- Heads I Win.txt").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
