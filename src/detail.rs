//! Detail page extraction: identity fields and the map/social bundle

use regex::Regex;
use std::sync::OnceLock;

use crate::fetch::Page;
use crate::profile::{LinkKind, Selectors};
use crate::types::{ShopIdentity, SocialBundle};
use crate::utils::element_text;
use crate::{Error, Result};

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

fn coordinate_pair() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)").expect("valid regex")
    })
}

/// Shop id is the fourth `/`-separated piece of the detail URL,
/// i.e. the first path segment of `https://host/<id>`.
pub fn shop_id_from_url(url: &str) -> Result<String> {
    url.split('/')
        .nth(3)
        .map(|segment| segment.split(['?', '#']).next().unwrap_or(segment).trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingShopId(url.to_string()))
}

/// Tag badge text with punctuation removed
pub fn clean_tag(text: &str) -> String {
    punctuation().replace_all(text, "").trim().to_string()
}

/// First two decimal numbers of a map link, as written in the link
pub fn parse_coordinates(map_link: &str) -> Option<(String, String)> {
    let caps = coordinate_pair().captures(map_link)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Identity of a shop. Fails only when the id or the name heading is missing.
pub fn extract_identity(page: &Page, selectors: &Selectors) -> Result<ShopIdentity> {
    let shop_id = shop_id_from_url(&page.url)?;

    let shop_name = match page.document.select(&selectors.shop_name).next() {
        Some(heading) => element_text(heading),
        None => {
            return Err(Error::MissingElement {
                url: page.url.clone(),
                selector: "shop name".to_string(),
            })
        }
    };

    let tags = page
        .document
        .select(&selectors.tag_badges)
        .map(|badge| clean_tag(&element_text(badge)))
        .filter(|tag| !tag.is_empty())
        .collect();

    Ok(ShopIdentity {
        shop_id,
        shop_name,
        tags,
    })
}

fn first_href(page: &Page, selectors: &Selectors, kind: LinkKind) -> String {
    selectors
        .link(kind)
        .and_then(|selector| page.document.select(selector).next())
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
        .unwrap_or_default()
}

/// Map and social links; every field is empty when the page lacks it
pub fn extract_social(page: &Page, selectors: &Selectors) -> SocialBundle {
    let map_link = first_href(page, selectors, LinkKind::Map);
    let (latitude, longitude) = parse_coordinates(&map_link).unwrap_or_default();

    SocialBundle {
        latitude,
        longitude,
        instagram_link: first_href(page, selectors, LinkKind::Instagram),
        facebook_link: first_href(page, selectors, LinkKind::Facebook),
        twitter_link: first_href(page, selectors, LinkKind::Twitter),
        tiktok_link: first_href(page, selectors, LinkKind::Tiktok),
        whatsapp_link: first_href(page, selectors, LinkKind::Whatsapp),
        map_link,
    }
}
