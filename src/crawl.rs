use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{error, info};

use crate::assemble::assemble;
use crate::detail::{extract_identity, extract_social};
use crate::fetch::PageSource;
use crate::index::list_detail_references;
use crate::profile::Selectors;
use crate::store::append_new;
use crate::types::{ListingReference, ShopRecord};
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct CrawlSummary {
    /// Listing rows yielded by the directory walk
    pub listings: usize,
    /// Records assembled from detail pages
    pub assembled: usize,
    /// Rows newly written to the store
    pub appended: usize,
    /// (detail url or directory page, error message)
    pub failed: Vec<(String, String)>,
}

/// Fetch one detail page and turn it into a record
pub fn scrape_listing<S: PageSource + ?Sized>(
    source: &S,
    selectors: &Selectors,
    listing: &ListingReference,
    collected_at: NaiveDateTime,
) -> Result<ShopRecord> {
    let page = source.fetch(&listing.detail_url)?;
    let identity = extract_identity(&page, selectors)?;
    let social = extract_social(&page, selectors);
    Ok(assemble(listing, identity, social, collected_at))
}

/// Walk the directory and scrape every listing, in pagination order.
/// A listing that fails is reported and left out; the walk continues.
pub fn crawl<S: PageSource + ?Sized>(
    source: &S,
    selectors: &Selectors,
    base_url: &str,
    collected_at: NaiveDateTime,
    quiet: bool,
) -> Result<(Vec<ShopRecord>, CrawlSummary)> {
    let mut summary = CrawlSummary::default();
    let mut records = Vec::new();

    for listing in list_detail_references(source, selectors, base_url)? {
        let listing = match listing {
            Ok(listing) => listing,
            Err(Error::DirectoryPage { url, source }) => {
                error!(url = %url, "directory page failed: {}", source);
                summary.failed.push((url, source.to_string()));
                continue;
            }
            Err(e) => {
                error!("directory page failed: {}", e);
                summary.failed.push((base_url.to_string(), e.to_string()));
                continue;
            }
        };
        summary.listings += 1;

        if !quiet {
            println!("[{:03}] Scraping: {}", summary.listings, listing.detail_url);
        }

        match scrape_listing(source, selectors, &listing, collected_at) {
            Ok(record) => {
                records.push(record);
                summary.assembled += 1;
            }
            Err(e) => {
                error!(url = %listing.detail_url, "listing failed: {}", e);
                summary.failed.push((listing.detail_url.clone(), e.to_string()));
            }
        }
    }

    Ok((records, summary))
}

/// Crawl, then append the unseen records to the store
pub fn run_crawl<S: PageSource + ?Sized>(
    source: &S,
    selectors: &Selectors,
    base_url: &str,
    store_path: &Path,
    collected_at: NaiveDateTime,
    quiet: bool,
) -> Result<CrawlSummary> {
    let (records, mut summary) = crawl(source, selectors, base_url, collected_at, quiet)?;
    summary.appended = append_new(&records, store_path)?;

    info!(
        listings = summary.listings,
        assembled = summary.assembled,
        appended = summary.appended,
        failed = summary.failed.len(),
        "crawl finished"
    );
    Ok(summary)
}
