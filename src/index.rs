//! Directory walk: page count discovery and listing row extraction

use regex::Regex;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::fetch::{Page, PageSource};
use crate::profile::Selectors;
use crate::types::{ListingReference, UNKNOWN};
use crate::utils::{element_text, page_url};
use crate::{Error, Result};

fn page_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]page=(\d+)").expect("valid regex"))
}

/// Highest page number advertised by the pagination control; 1 when there is none
pub fn total_pages(page: &Page, selectors: &Selectors) -> u32 {
    page.document
        .select(&selectors.pagination_links)
        .filter_map(|link| {
            let from_text = element_text(link).parse::<u32>().ok();
            let from_href = link
                .value()
                .attr("href")
                .and_then(|href| page_param().captures(href))
                .and_then(|caps| caps[1].parse::<u32>().ok());
            from_text.max(from_href)
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Listing rows of one directory page, in document order
pub fn extract_listings(page: &Page, selectors: &Selectors) -> Vec<ListingReference> {
    let base = Url::parse(&page.url).ok();
    let mut listings = Vec::new();

    for row in page.document.select(&selectors.listing_row) {
        let href = match row
            .select(&selectors.detail_link)
            .next()
            .and_then(|link| link.value().attr("href"))
        {
            Some(href) => href.trim(),
            None => {
                debug!(page = %page.url, "listing row without detail link, skipping");
                continue;
            }
        };

        let detail_url = match base.as_ref().and_then(|b| b.join(href).ok()) {
            Some(url) => url.to_string(),
            None => match Url::parse(href) {
                Ok(url) => url.to_string(),
                Err(_) => {
                    debug!(page = %page.url, href, "unresolvable detail link, skipping");
                    continue;
                }
            },
        };

        let mut context = match &selectors.context_links {
            Some(selector) => row
                .select(selector)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .take(2)
                .collect::<Vec<_>>(),
            None => Vec::new(),
        }
        .into_iter();

        listings.push(ListingReference {
            detail_url,
            district: context.next().unwrap_or_else(|| UNKNOWN.to_string()),
            state: context.next().unwrap_or_else(|| UNKNOWN.to_string()),
        });
    }

    listings
}

/// Lazily walks every directory page and yields its listings.
///
/// Page 1 is fetched up front to learn the page count; pages `1..=total` are
/// then fetched one at a time as the iterator is drained. A page that fails to
/// fetch yields a single `Err` and the walk moves on to the next page.
pub struct ListingIndex<'a, S: PageSource + ?Sized> {
    source: &'a S,
    selectors: &'a Selectors,
    base_url: String,
    total_pages: u32,
    next_page: u32,
    pending: VecDeque<ListingReference>,
}

impl<'a, S: PageSource + ?Sized> ListingIndex<'a, S> {
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }
}

impl<S: PageSource + ?Sized> Iterator for ListingIndex<'_, S> {
    type Item = Result<ListingReference>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(listing) = self.pending.pop_front() {
                return Some(Ok(listing));
            }
            if self.next_page > self.total_pages {
                return None;
            }

            let url = page_url(&self.base_url, self.next_page);
            self.next_page += 1;
            match self.source.fetch(&url) {
                Ok(page) => {
                    let listings = extract_listings(&page, self.selectors);
                    debug!(url = %url, count = listings.len(), "directory page");
                    self.pending.extend(listings);
                }
                Err(e) => {
                    return Some(Err(Error::DirectoryPage {
                        url,
                        source: Box::new(e),
                    }))
                }
            }
        }
    }
}

/// Start a walk over the directory rooted at `base_url`
pub fn list_detail_references<'a, S: PageSource + ?Sized>(
    source: &'a S,
    selectors: &'a Selectors,
    base_url: &str,
) -> Result<ListingIndex<'a, S>> {
    let first = source.fetch(base_url)?;
    let total = total_pages(&first, selectors);
    info!(base_url, total_pages = total, "directory pagination");

    Ok(ListingIndex {
        source,
        selectors,
        base_url: base_url.to_string(),
        total_pages: total,
        next_page: 1,
        pending: VecDeque::new(),
    })
}
