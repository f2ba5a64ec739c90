//! Country code extraction from the public search page

use crate::catalog::FilterCatalog;
use crate::SweepError;
use reqwest::Client;
use scraper::{Html, Selector};

/// Extracts option values of every `<select name="nationality">` element
///
/// Options without a `value` attribute, or with an empty one (the usual
/// "all countries" placeholder), are skipped.
pub fn extract_codes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse(r#"select[name="nationality"] option[value]"#) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|option| option.value().attr("value"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fetches the search page and builds a catalog from its nationality selector
pub async fn scrape_catalog(client: &Client, page_url: &str) -> Result<FilterCatalog, SweepError> {
    tracing::info!("Scraping filter catalog from {}", page_url);

    let response = client.get(page_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SweepError::Catalog(format!(
            "catalog page {} returned HTTP {}",
            page_url,
            status.as_u16()
        )));
    }

    let body = response.text().await?;
    Ok(FilterCatalog::from_codes(extract_codes(&body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEARCH_PAGE: &str = r#"<html><body>
        <form>
          <select name="nationality">
            <option value="">All</option>
            <option value="FR">France</option>
            <option value="DE">Germany</option>
            <option>No value</option>
          </select>
          <select name="sexId">
            <option value="M">Male</option>
          </select>
        </form>
    </body></html>"#;

    #[test]
    fn test_extract_codes_only_reads_nationality_select() {
        assert_eq!(extract_codes(SEARCH_PAGE), vec!["FR", "DE"]);
    }

    #[test]
    fn test_extract_codes_without_select() {
        assert!(extract_codes("<html><body><p>nothing</p></body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_scrape_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notices"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
            .mount(&server)
            .await;

        let catalog = scrape_catalog(&Client::new(), &format!("{}/notices", server.uri()))
            .await
            .unwrap();
        assert_eq!(catalog.codes(), &["FR", "DE"]);
    }

    #[tokio::test]
    async fn test_scrape_catalog_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = scrape_catalog(&Client::new(), &server.uri()).await;
        assert!(matches!(result, Err(SweepError::Catalog(_))));
    }
}
