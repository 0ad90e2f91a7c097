//! Record types shared by the crawl and load stages

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Placeholder for a district or state the directory did not report
pub const UNKNOWN: &str = "Unknown";

/// Malaysian states and federal territories listed by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Johor,
    Kedah,
    Kelantan,
    Melaka,
    NegeriSembilan,
    Pahang,
    PulauPinang,
    Perak,
    Perlis,
    Selangor,
    Terengganu,
    Sabah,
    Sarawak,
    KualaLumpur,
    Labuan,
    Putrajaya,
}

impl State {
    pub const ALL: [State; 16] = [
        State::Johor,
        State::Kedah,
        State::Kelantan,
        State::Melaka,
        State::NegeriSembilan,
        State::Pahang,
        State::PulauPinang,
        State::Perak,
        State::Perlis,
        State::Selangor,
        State::Terengganu,
        State::Sabah,
        State::Sarawak,
        State::KualaLumpur,
        State::Labuan,
        State::Putrajaya,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Johor => "Johor",
            State::Kedah => "Kedah",
            State::Kelantan => "Kelantan",
            State::Melaka => "Melaka",
            State::NegeriSembilan => "Negeri Sembilan",
            State::Pahang => "Pahang",
            State::PulauPinang => "Pulau Pinang",
            State::Perak => "Perak",
            State::Perlis => "Perlis",
            State::Selangor => "Selangor",
            State::Terengganu => "Terengganu",
            State::Sabah => "Sabah",
            State::Sarawak => "Sarawak",
            State::KualaLumpur => "Kuala Lumpur",
            State::Labuan => "Labuan",
            State::Putrajaya => "Putrajaya",
        }
    }

    /// Official state code (as used on MyKad numbers)
    pub fn code(&self) -> u8 {
        match self {
            State::Johor => 1,
            State::Kedah => 2,
            State::Kelantan => 3,
            State::Melaka => 4,
            State::NegeriSembilan => 5,
            State::Pahang => 6,
            State::PulauPinang => 7,
            State::Perak => 8,
            State::Perlis => 9,
            State::Selangor => 10,
            State::Terengganu => 11,
            State::Sabah => 12,
            State::Sarawak => 13,
            State::KualaLumpur => 14,
            State::Labuan => 15,
            State::Putrajaya => 16,
        }
    }

    /// Match a state name as the directory prints it, including common spellings
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let state = match lower.as_str() {
            "johor" => State::Johor,
            "kedah" => State::Kedah,
            "kelantan" => State::Kelantan,
            "melaka" | "malacca" => State::Melaka,
            "negeri sembilan" => State::NegeriSembilan,
            "pahang" => State::Pahang,
            "pulau pinang" | "penang" => State::PulauPinang,
            "perak" => State::Perak,
            "perlis" => State::Perlis,
            "selangor" => State::Selangor,
            "terengganu" => State::Terengganu,
            "sabah" => State::Sabah,
            "sarawak" => State::Sarawak,
            "kuala lumpur" | "wilayah persekutuan kuala lumpur" | "wp kuala lumpur" => {
                State::KualaLumpur
            }
            "labuan" | "wilayah persekutuan labuan" | "wp labuan" => State::Labuan,
            "putrajaya" | "wilayah persekutuan putrajaya" | "wp putrajaya" => State::Putrajaya,
            _ => return None,
        };
        Some(state)
    }
}

/// State code column of a stored record: a numeric code or the `Unknown` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateCode {
    Known(u8),
    #[default]
    Unknown,
}

impl StateCode {
    /// Code used for the placeholder row in the `states` table
    pub const UNKNOWN_ROW: i64 = 0;

    pub fn for_state_name(name: &str) -> Self {
        match State::from_name(name) {
            Some(state) => StateCode::Known(state.code()),
            None => StateCode::Unknown,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<u8>() {
            Ok(code) => StateCode::Known(code),
            Err(_) => StateCode::Unknown,
        }
    }

    /// Key written to `states.state_code`
    pub fn db_key(&self) -> i64 {
        match self {
            StateCode::Known(code) => i64::from(*code),
            StateCode::Unknown => Self::UNKNOWN_ROW,
        }
    }
}

impl std::fmt::Display for StateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateCode::Known(code) => write!(f, "{}", code),
            StateCode::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl Serialize for StateCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StateCode::parse(&s))
    }
}

/// One directory row: where to find the detail page and its location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReference {
    pub detail_url: String,
    pub district: String,
    pub state: String,
}

/// Identity fields read from a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopIdentity {
    pub shop_id: String,
    pub shop_name: String,
    pub tags: Vec<String>,
}

/// Map and social links read from a detail page; empty strings when absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialBundle {
    pub map_link: String,
    pub latitude: String,
    pub longitude: String,
    pub instagram_link: String,
    pub facebook_link: String,
    pub twitter_link: String,
    pub tiktok_link: String,
    pub whatsapp_link: String,
}

/// Flat, denormalized record persisted to the CSV store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopRecord {
    #[serde(rename = "Shop_ID")]
    pub shop_id: String,
    #[serde(rename = "Shopname")]
    pub shop_name: String,
    #[serde(rename = "Tag", default)]
    pub tags: String,
    #[serde(rename = "Googlemap_link", default)]
    pub map_link: String,
    #[serde(rename = "Latitude", default)]
    pub latitude: String,
    #[serde(rename = "Longitude", default)]
    pub longitude: String,
    #[serde(rename = "District", default)]
    pub district: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "State_code", default)]
    pub state_code: StateCode,
    #[serde(rename = "Instagram_link", default)]
    pub instagram_link: String,
    #[serde(rename = "Facebook_link", default)]
    pub facebook_link: String,
    #[serde(rename = "Twitter_link", default)]
    pub twitter_link: String,
    #[serde(rename = "Tiktok_link", default)]
    pub tiktok_link: String,
    #[serde(rename = "Whatsapp_link", default)]
    pub whatsapp_link: String,
    #[serde(rename = "Date Collected")]
    pub date_collected: String,
    #[serde(rename = "Time Collected")]
    pub time_collected: String,
}

impl ShopRecord {
    /// Store columns, in the order a fresh store is written
    pub const HEADERS: [&'static str; 16] = [
        "Shop_ID",
        "Shopname",
        "Tag",
        "Googlemap_link",
        "Latitude",
        "Longitude",
        "District",
        "State",
        "State_code",
        "Instagram_link",
        "Facebook_link",
        "Twitter_link",
        "Tiktok_link",
        "Whatsapp_link",
        "Date Collected",
        "Time Collected",
    ];

    /// Value of a store column by header name
    pub fn field(&self, header: &str) -> Option<String> {
        let value = match header {
            "Shop_ID" => self.shop_id.clone(),
            "Shopname" => self.shop_name.clone(),
            "Tag" => self.tags.clone(),
            "Googlemap_link" => self.map_link.clone(),
            "Latitude" => self.latitude.clone(),
            "Longitude" => self.longitude.clone(),
            "District" => self.district.clone(),
            "State" => self.state.clone(),
            "State_code" => self.state_code.to_string(),
            "Instagram_link" => self.instagram_link.clone(),
            "Facebook_link" => self.facebook_link.clone(),
            "Twitter_link" => self.twitter_link.clone(),
            "Tiktok_link" => self.tiktok_link.clone(),
            "Whatsapp_link" => self.whatsapp_link.clone(),
            "Date Collected" => self.date_collected.clone(),
            "Time Collected" => self.time_collected.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Apply `f` to every free-text column
    pub fn map_text(mut self, f: impl Fn(&str) -> String) -> Self {
        for field in [
            &mut self.shop_id,
            &mut self.shop_name,
            &mut self.tags,
            &mut self.map_link,
            &mut self.latitude,
            &mut self.longitude,
            &mut self.district,
            &mut self.state,
            &mut self.instagram_link,
            &mut self.facebook_link,
            &mut self.twitter_link,
            &mut self.tiktok_link,
            &mut self.whatsapp_link,
            &mut self.date_collected,
            &mut self.time_collected,
        ] {
            *field = f(field.as_str());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selangor_code() {
        assert_eq!(StateCode::for_state_name("Selangor"), StateCode::Known(10));
        assert_eq!(StateCode::for_state_name(" selangor "), StateCode::Known(10));
    }

    #[test]
    fn test_unknown_state_code() {
        assert_eq!(StateCode::for_state_name("Atlantis"), StateCode::Unknown);
        assert_eq!(StateCode::for_state_name(UNKNOWN), StateCode::Unknown);
        assert_eq!(StateCode::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_state_codes_are_distinct() {
        let mut codes: Vec<u8> = State::ALL.iter().map(|s| s.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes, (1..=16).collect::<Vec<u8>>());
        for state in State::ALL {
            assert_eq!(State::from_name(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_state_code_parse() {
        assert_eq!(StateCode::parse("14"), StateCode::Known(14));
        assert_eq!(StateCode::parse("Unknown"), StateCode::Unknown);
        assert_eq!(StateCode::parse(""), StateCode::Unknown);
        assert_eq!(StateCode::Unknown.db_key(), StateCode::UNKNOWN_ROW);
    }
}
