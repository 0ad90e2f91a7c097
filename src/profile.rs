//! Site profiles: the CSS selectors that describe one directory layout
//!
//! Directory variants differ only in markup details (whether listing rows carry
//! district/state links, where tag badges live). A profile captures those
//! differences so a single crawler handles every variant. Profiles are stored
//! as CONL files; any field left out falls back to the built-in layout.

use scraper::Selector;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Social and map link categories probed on every detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Map,
    Instagram,
    Facebook,
    Twitter,
    Tiktok,
    Whatsapp,
}

impl LinkKind {
    pub const ALL: [LinkKind; 6] = [
        LinkKind::Map,
        LinkKind::Instagram,
        LinkKind::Facebook,
        LinkKind::Twitter,
        LinkKind::Tiktok,
        LinkKind::Whatsapp,
    ];

    /// Substring an anchor's href must contain to belong to this category
    pub fn href_token(&self) -> &'static str {
        match self {
            LinkKind::Map => "google.com",
            LinkKind::Instagram => "instagram.com",
            LinkKind::Facebook => "facebook.com",
            LinkKind::Twitter => "twitter.com",
            LinkKind::Tiktok => "tiktok.com",
            LinkKind::Whatsapp => "wa.me",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteProfile {
    /// One element per directory entry
    pub listing_row: String,
    /// Anchor inside a row pointing at the detail page
    pub detail_link: String,
    /// Anchors inside a row naming the district, then the state.
    /// Empty for layouts without location context.
    pub context_links: String,
    /// Anchors of the pagination control
    pub pagination_links: String,
    pub shop_name: String,
    pub tag_badges: String,
    /// Element holding the map and social anchors
    pub link_container: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            listing_row: "ul[role='list'] > li".to_string(),
            detail_link: "div.text-sm.font-medium.text-gray-900.flex.items-center a".to_string(),
            context_links: "div.text-sm.text-gray-500 a".to_string(),
            pagination_links: "nav[aria-label='Pagination'] a".to_string(),
            shop_name: "div.mt-5.text-center.text-2xl.font-bold.leading-9.tracking-tight.text-gray-900.flex.items-center.space-x-2.justify-center span".to_string(),
            tag_badges: "div.flex.space-x-2.justify-center.flex-wrap.-mt-2 a span".to_string(),
            link_container: "div.flex.flex-col.space-y-4".to_string(),
        }
    }
}

impl SiteProfile {
    /// Load a profile from a CONL file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_conl(&content).map_err(|message| Error::Profile {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_conl(content: &str) -> std::result::Result<Self, String> {
        serde_conl::from_str(content).map_err(|e| e.to_string())
    }

    /// Parse every selector up front so a bad profile fails before any fetch
    pub fn compile(&self) -> Result<Selectors> {
        let links = LinkKind::ALL
            .iter()
            .map(|kind| {
                let css = format!("{} a[href*='{}']", self.link_container, kind.href_token());
                Ok((*kind, create_selector(&css)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Selectors {
            listing_row: create_selector(&self.listing_row)?,
            detail_link: create_selector(&self.detail_link)?,
            context_links: Some(self.context_links.trim())
                .filter(|css| !css.is_empty())
                .map(create_selector)
                .transpose()?,
            pagination_links: create_selector(&self.pagination_links)?,
            shop_name: create_selector(&self.shop_name)?,
            tag_badges: create_selector(&self.tag_badges)?,
            links,
        })
    }
}

/// Parsed form of a [`SiteProfile`]
#[derive(Debug, Clone)]
pub struct Selectors {
    pub listing_row: Selector,
    pub detail_link: Selector,
    pub context_links: Option<Selector>,
    pub pagination_links: Selector,
    pub shop_name: Selector,
    pub tag_badges: Selector,
    pub links: Vec<(LinkKind, Selector)>,
}

impl Selectors {
    pub fn link(&self, kind: LinkKind) -> Option<&Selector> {
        self.links
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, selector)| selector)
    }
}

#[inline]
pub(crate) fn create_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| Error::InvalidSelector(css.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_compiles() {
        let selectors = SiteProfile::default().compile().unwrap();
        assert!(selectors.context_links.is_some());
        for kind in LinkKind::ALL {
            assert!(selectors.link(kind).is_some());
        }
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let profile = SiteProfile {
            shop_name: "div[".to_string(),
            ..SiteProfile::default()
        };
        match profile.compile() {
            Err(Error::InvalidSelector(css)) => assert_eq!(css, "div["),
            other => panic!("expected invalid selector, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_profile_without_context_links() {
        let profile = SiteProfile {
            context_links: String::new(),
            ..SiteProfile::default()
        };
        assert!(profile.compile().unwrap().context_links.is_none());
    }

    #[test]
    fn test_partial_conl_profile_keeps_defaults() {
        let profile = SiteProfile::from_conl("listing_row = div.shop-row\n").unwrap();
        assert_eq!(profile.listing_row, "div.shop-row");
        assert_eq!(profile.tag_badges, SiteProfile::default().tag_badges);
    }

    #[test]
    fn test_plain_directory_profile() {
        let profile =
            SiteProfile::from_conl(include_str!("../profiles/plain-directory.conl")).unwrap();
        assert_eq!(profile.context_links, "");
        assert!(profile.compile().unwrap().context_links.is_none());
    }
}
