//! Search API response envelope
//!
//! A well-formed page looks like:
//!
//! ```json
//! {
//!   "total": 412,
//!   "_embedded": { "notices": [ { "entity_id": "2019/12345", ... } ] },
//!   "_links": { "last": { "href": "https://api.example.org/red?page=21" } }
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// A record exactly as the API returned it
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Notice(Value);

impl Notice {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// The stable identity of the underlying entity, if present
    pub fn identity(&self) -> Option<&str> {
        self.0
            .get("entity_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Returns a top-level string field
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the raw JSON value
    pub fn raw(&self) -> &Value {
        &self.0
    }
}

/// One decoded result page
#[derive(Debug, Clone)]
pub struct Page {
    /// The page number that was requested
    pub number: u32,

    /// Total number of results the API reports for the query
    pub total: u64,

    /// Records on this page
    pub notices: Vec<Notice>,

    /// Final page number advertised by the `last` link
    pub last_page: Option<u32>,
}

/// Why a body could not be turned into a page
#[derive(Debug)]
pub enum EnvelopeError {
    /// Not JSON at all
    Decode(serde_json::Error),
    /// JSON, but without the fields a page needs
    ///
    /// `total` is set when the envelope still reported one.
    Shape {
        message: String,
        total: Option<u64>,
    },
}

impl EnvelopeError {
    fn shape(message: impl Into<String>, total: Option<u64>) -> Self {
        Self::Shape {
            message: message.into(),
            total,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    total: Option<u64>,
    #[serde(rename = "_embedded")]
    embedded: Option<RawEmbedded>,
    #[serde(rename = "_links")]
    links: Option<RawLinks>,
}

#[derive(Deserialize)]
struct RawEmbedded {
    notices: Option<Vec<Notice>>,
}

#[derive(Deserialize)]
struct RawLinks {
    last: Option<RawLink>,
}

#[derive(Deserialize)]
struct RawLink {
    href: String,
}

/// Parses a response body into a page
pub fn parse_page(body: &str, number: u32) -> Result<Page, EnvelopeError> {
    let value: Value = serde_json::from_str(body).map_err(EnvelopeError::Decode)?;
    let envelope: RawEnvelope = serde_json::from_value(value).map_err(|e| {
        EnvelopeError::shape(format!("envelope fields have wrong types: {}", e), None)
    })?;

    let total = envelope
        .total
        .ok_or_else(|| EnvelopeError::shape("missing 'total'", None))?;

    let notices = envelope
        .embedded
        .and_then(|embedded| embedded.notices)
        .ok_or_else(|| EnvelopeError::shape("missing '_embedded.notices'", Some(total)))?;

    let last_page = envelope
        .links
        .and_then(|links| links.last)
        .and_then(|last| page_number_from_href(&last.href));

    Ok(Page {
        number,
        total,
        notices,
        last_page,
    })
}

/// Reads the `page` query parameter of a link, which may be relative
pub fn page_number_from_href(href: &str) -> Option<u32> {
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse("http://localhost/").ok()?.join(href).ok()?,
    };

    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
