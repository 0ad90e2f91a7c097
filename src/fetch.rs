use scraper::Html;
use std::collections::HashMap;
use tracing::debug;

use crate::{Error, Result};

/// A fetched and parsed HTML document together with the URL it came from
pub struct Page {
    pub url: String,
    pub document: Html,
}

impl Page {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
        }
    }
}

/// Source of HTML documents. The crawler only ever sees this trait, so the
/// HTTP session is owned by the caller and tests can serve canned pages.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<Page>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; PetakopiIngest/1.0)")
            .build()
            .map_err(|source| Error::Http {
                url: "(client setup)".to_string(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Page> {
        debug!(url, "fetching");
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };

        let text = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .text()
            .map_err(http_err)?;

        Ok(Page::parse(url, &text))
    }
}

/// In-memory site keyed by exact URL
#[derive(Debug, Default, Clone)]
pub struct StaticSite {
    pages: HashMap<String, String>,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.insert(url, html);
        self
    }

    pub fn insert(&mut self, url: &str, html: &str) {
        self.pages.insert(url.to_string(), html.to_string());
    }
}

impl PageSource for StaticSite {
    fn fetch(&self, url: &str) -> Result<Page> {
        let html = self.pages.get(url).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no page for {}", url),
            ))
        })?;
        Ok(Page::parse(url, html))
    }
}
