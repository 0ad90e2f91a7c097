use chrono::NaiveDateTime;

use crate::types::{ListingReference, ShopIdentity, ShopRecord, SocialBundle, StateCode};

/// `Date Collected` column format
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// `Time Collected` column format
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Merge everything known about one listing into a flat store record
pub fn assemble(
    listing: &ListingReference,
    identity: ShopIdentity,
    social: SocialBundle,
    collected_at: NaiveDateTime,
) -> ShopRecord {
    ShopRecord {
        shop_id: identity.shop_id,
        shop_name: identity.shop_name,
        tags: identity.tags.join(", "),
        map_link: social.map_link,
        latitude: social.latitude,
        longitude: social.longitude,
        district: listing.district.clone(),
        state: listing.state.clone(),
        state_code: StateCode::for_state_name(&listing.state),
        instagram_link: social.instagram_link,
        facebook_link: social.facebook_link,
        twitter_link: social.twitter_link,
        tiktok_link: social.tiktok_link,
        whatsapp_link: social.whatsapp_link,
        date_collected: collected_at.format(DATE_FORMAT).to_string(),
        time_collected: collected_at.format(TIME_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNKNOWN;
    use chrono::NaiveDate;

    fn collected_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn identity(tags: &[&str]) -> ShopIdentity {
        ShopIdentity {
            shop_id: "kopi-kampung".to_string(),
            shop_name: "Kopi Kampung".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_assemble_known_state() {
        let listing = ListingReference {
            detail_url: "https://petakopi.my/kopi-kampung".to_string(),
            district: "Petaling".to_string(),
            state: "Selangor".to_string(),
        };
        let social = SocialBundle {
            map_link: "https://maps.google.com/?q=3.1,101.6".to_string(),
            latitude: "3.1".to_string(),
            longitude: "101.6".to_string(),
            ..SocialBundle::default()
        };
        let record = assemble(&listing, identity(&["WiFi", "Halal"]), social, collected_at());

        assert_eq!(record.shop_id, "kopi-kampung");
        assert_eq!(record.tags, "WiFi, Halal");
        assert_eq!(record.state_code, StateCode::Known(10));
        assert_eq!(record.latitude, "3.1");
        assert_eq!(record.instagram_link, "");
        assert_eq!(record.date_collected, "09-03-2024");
        assert_eq!(record.time_collected, "14:05:07");
    }

    #[test]
    fn test_assemble_unknown_state_and_no_tags() {
        let listing = ListingReference {
            detail_url: "https://petakopi.my/kopi-kampung".to_string(),
            district: UNKNOWN.to_string(),
            state: UNKNOWN.to_string(),
        };
        let record = assemble(&listing, identity(&[]), SocialBundle::default(), collected_at());
        assert_eq!(record.tags, "");
        assert_eq!(record.state_code, StateCode::Unknown);
        assert_eq!(record.state_code.to_string(), "Unknown");
    }
}
