use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Required element missing on {url}. Selector: {selector}")]
    MissingElement { url: String, selector: String },

    #[error("No shop id in detail url: {0}")]
    MissingShopId(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Shop {shop_id} references tag '{tag}' which is not in the tag vocabulary")]
    UnknownTag { shop_id: String, tag: String },

    #[error("Database schema is missing table '{0}'. Run 'init-db' first.")]
    SchemaMissing(&'static str),

    #[error("Shop {shop_id} has an unparseable collection timestamp '{value}'")]
    InvalidTimestamp { shop_id: String, value: String },

    #[error("Store {path} has no {column} column; refusing to append without dedup")]
    StoreWithoutId { path: String, column: &'static str },

    #[error("Directory page {url} failed: {source}")]
    DirectoryPage {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse site profile {path}: {message}")]
    Profile { path: String, message: String },

    #[error("Sqlite Error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
}
