//! Filter catalog: the country codes used by the country dimensions
//!
//! The catalog is a snapshot taken once at the start of a run, either from
//! the configuration or by scraping the public search page.

mod scrape;

pub use scrape::{extract_codes, scrape_catalog};

use crate::config::CatalogConfig;
use crate::SweepError;
use reqwest::Client;
use std::collections::HashSet;

/// Ordered, de-duplicated list of country codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCatalog {
    codes: Vec<String>,
}

impl FilterCatalog {
    /// Builds a catalog from raw codes
    ///
    /// Codes are trimmed and upper-cased; blanks and repeats are dropped while
    /// first-seen order is kept.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let codes = codes
            .into_iter()
            .map(|code| code.as_ref().trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .filter(|code| seen.insert(code.clone()))
            .collect();

        Self { codes }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Loads the catalog described by the configuration
///
/// Inline codes win over the scrape URL. An empty result is an error because
/// the country dimensions would have nothing to split on.
pub async fn load_catalog(
    config: &CatalogConfig,
    client: &Client,
) -> Result<FilterCatalog, SweepError> {
    let catalog = if !config.codes.is_empty() {
        FilterCatalog::from_codes(&config.codes)
    } else if let Some(page_url) = &config.page_url {
        scrape_catalog(client, page_url).await?
    } else {
        return Err(SweepError::Catalog(
            "no catalog source configured".to_string(),
        ));
    };

    if catalog.is_empty() {
        return Err(SweepError::Catalog(
            "catalog contains no country codes".to_string(),
        ));
    }

    tracing::info!(codes = catalog.len(), "Filter catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_codes_normalizes_and_dedups() {
        let catalog = FilterCatalog::from_codes(["fr", " DE ", "FR", "", "us"]);
        assert_eq!(catalog.codes(), &["FR", "DE", "US"]);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_load_catalog_prefers_inline_codes() {
        let config = CatalogConfig {
            codes: vec!["IT".to_string()],
            page_url: Some("https://unreachable.invalid/".to_string()),
        };

        let catalog = load_catalog(&config, &Client::new()).await.unwrap();
        assert_eq!(catalog.codes(), &["IT"]);
    }

    #[tokio::test]
    async fn test_load_catalog_without_source_fails() {
        let result = load_catalog(&CatalogConfig::default(), &Client::new()).await;
        assert!(matches!(result, Err(SweepError::Catalog(_))));
    }
}
