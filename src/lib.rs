//! Crawl a paginated shop directory into an append-only CSV store and load
//! that store into a normalized SQLite schema. Both stages are safe to re-run.

use rusqlite::Connection;
use std::path::Path;

pub mod assemble;
pub mod config;
pub mod crawl;
pub mod detail;
mod error;
pub mod fetch;
pub mod index;
pub mod load;
pub mod profile;
pub mod store;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use types::*;

/// Open the relational store with foreign keys enforced
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Create the eight normalized tables if they do not exist yet
pub fn init_database(conn: &Connection) -> Result<()> {
    let schema = include_str!("../schema.sql");
    conn.execute_batch(schema)?;
    Ok(())
}
