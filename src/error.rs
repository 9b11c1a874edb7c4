//! Recoverable failures raised while turning one product page into a decklist

use std::error::Error as StdError;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Line does not have the `<count> x <name>` shape
    #[error("unexpected line format: {line:?}")]
    MalformedLine { line: String },

    #[error("invalid count {count:?} in line {line:?}")]
    InvalidCount { line: String, count: String },

    #[error("no cards found for {title:?}")]
    NoItemsFound { title: String },

    /// Network or decoding failure on any external call
    #[error("failed to fetch {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: BoxError,
    },

    #[error("found more images than loaded cards ({items}) at image {index}")]
    StructuralMismatch { index: usize, items: usize },
}

impl ScrapeError {
    pub fn fetch(uri: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ScrapeError::Fetch {
            uri: uri.into(),
            source: source.into(),
        }
    }

    /// Line-level errors only cost the offending line, not the product
    pub fn is_line_error(&self) -> bool {
        matches!(
            self,
            ScrapeError::MalformedLine { .. } | ScrapeError::InvalidCount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_keeps_uri_and_source() {
        let err = ScrapeError::fetch("https://example.com/a.png", "connection reset");
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.com/a.png: connection reset"
        );
        assert!(err.source().is_some());
        assert!(!err.is_line_error());
    }

    #[test]
    fn test_line_errors() {
        let err = ScrapeError::MalformedLine {
            line: "Lightning Bolt".to_string(),
        };
        assert!(err.is_line_error());
    }
}
