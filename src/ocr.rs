//! Collector numbers read off card images

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{BoxError, ScrapeError};
use crate::fetch::HttpClient;
use crate::types::{NumberSource, Product};

/// Digits plus the glyphs that follow the number on the card frame
pub const WHITELIST: &str = "0123456789 ™ ©";
const TERMINATORS: [&str; 2] = ["™", "©"];

/// Black-box text recognition over raw image bytes
pub trait TextRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<String, BoxError>;
}

/// The `tesseract` command line, fed through stdin
pub struct Tesseract {
    binary: PathBuf,
}

impl Tesseract {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl TextRecognizer for Tesseract {
    fn recognize(&self, image: &[u8]) -> Result<String, BoxError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-c"])
            .arg(format!("tessedit_char_whitelist={WHITELIST}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Closing stdin before waiting lets tesseract see end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(image),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )
            .into());
        }
        written?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reads a collector number from an image link
pub trait NumberReader {
    fn read_number(&self, uri: &str) -> Result<Option<String>, ScrapeError>;
}

pub struct OcrReader<'a, R: TextRecognizer> {
    client: &'a HttpClient,
    recognizer: R,
}

impl<'a, R: TextRecognizer> OcrReader<'a, R> {
    pub fn new(client: &'a HttpClient, recognizer: R) -> Self {
        Self { client, recognizer }
    }
}

impl<R: TextRecognizer> NumberReader for OcrReader<'_, R> {
    fn read_number(&self, uri: &str) -> Result<Option<String>, ScrapeError> {
        let image = self.client.get_bytes(uri)?;
        let text = self
            .recognizer
            .recognize(&image)
            .map_err(|e| ScrapeError::fetch(uri, e))?;
        debug!("OCR {}: {:?}", uri, text);
        Ok(number_from_text(&text))
    }
}

/// First all-digit token longer than `min_len`, unless a terminator comes first
pub fn extract_number<'t>(tokens: &[&'t str], min_len: usize) -> Option<&'t str> {
    for token in tokens {
        if TERMINATORS.iter().any(|t| t == token) {
            return None;
        }
        if token.len() > min_len && token.chars().all(|c| c.is_ascii_digit()) {
            return Some(*token);
        }
    }
    None
}

pub fn number_from_text(text: &str) -> Option<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    extract_number(&tokens, 3)
        .or_else(|| extract_number(&tokens, 2))
        .map(str::to_string)
}

/// Gallery headings like "Heads I Win (10)" announce the image count. Twice
/// as many images as cards means fronts and backs alternate.
pub fn is_fold_mode(gallery_title: &str, cards: usize) -> bool {
    if cards == 0 || !gallery_title.contains(" (") {
        return false;
    }
    let expected = gallery_title
        .split_whitespace()
        .last()
        .map(|f| f.trim_start_matches('(').trim_end_matches(')'))
        .and_then(|f| f.parse::<usize>().ok())
        .unwrap_or(0);
    expected == cards * 2
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImagePass {
    pub recognized: usize,
    pub failed: usize,
    /// Set when the page had more images than cards
    pub mismatch: Option<String>,
}

/// Fill missing numbers from per-card images, in page order.
///
/// Cards that already carry a number are skipped. In fold mode only the
/// first image of each pair is read.
pub fn fill_from_images(
    product: &mut Product,
    images: &[Option<String>],
    fold: bool,
    reader: &dyn NumberReader,
) -> ImagePass {
    let mut pass = ImagePass::default();
    let title = product.title.clone();
    let total = product.len();

    for (index, link) in images.iter().enumerate() {
        if fold && index % 2 == 1 {
            continue;
        }
        let position = if fold { index / 2 } else { index };

        let Some(card) = product.card_at_mut(position) else {
            let err = ScrapeError::StructuralMismatch {
                index,
                items: total,
            };
            warn!("{}: {}, something may be off", title, err);
            pass.mismatch = Some(err.to_string());
            break;
        };
        if card.has_number() {
            continue;
        }
        let Some(link) = link else {
            continue;
        };

        match reader.read_number(link) {
            Ok(Some(number)) => {
                debug!("{} -> {}", card.name, number);
                card.assign_number(&number, NumberSource::Recognized);
                pass.recognized += 1;
            }
            Ok(None) => debug!("No number found in {}", link),
            Err(e) => {
                warn!("{}: {}", title, e);
                pass.failed += 1;
            }
        }
    }

    pass
}
