use std::env;
use std::path::PathBuf;

use crate::profile::SiteProfile;
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://petakopi.my/";
pub const DEFAULT_STORE_PATH: &str = "output_csv/scraped_data.csv";
pub const DEFAULT_DATABASE_PATH: &str = "petakopi.db";

/// Batch settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub store_path: PathBuf,
    pub database_path: PathBuf,
    /// CONL site profile; the built-in profile is used when unset
    pub profile_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            profile_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            base_url: get("BASE_URL").unwrap_or(defaults.base_url),
            store_path: get("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            profile_path: get("SITE_PROFILE").map(PathBuf::from),
        }
    }

    pub fn site_profile(&self) -> Result<SiteProfile> {
        match &self.profile_path {
            Some(path) => SiteProfile::load(path),
            None => Ok(SiteProfile::default()),
        }
    }
}
