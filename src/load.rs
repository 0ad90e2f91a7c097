//! Idempotent load of the flat store into the normalized schema

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, error, info};

use crate::assemble::{DATE_FORMAT, TIME_FORMAT};
use crate::store::read_records;
use crate::types::{ShopRecord, StateCode, UNKNOWN};
use crate::{Error, Result};

/// Tag recorded for shops whose tag field is empty
pub const TAG_PLACEHOLDER: &str = "N/A";

/// Tables the loader writes to; all must exist before a load starts
pub const TABLES: [&str; 8] = [
    "states",
    "districts",
    "coordinates",
    "shops",
    "tags",
    "shop_tags",
    "social_media_links",
    "data_collection",
];

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    /// (shop id or row label, error message)
    pub failed: Vec<(String, String)>,
}

/// Fail fast when the connection is unusable or the schema was never created
pub fn verify_schema(conn: &Connection) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    for table in TABLES {
        let count: i64 = stmt.query_row([table], |row| row.get(0))?;
        if count == 0 {
            return Err(Error::SchemaMissing(table));
        }
    }
    Ok(())
}

/// Split a stored tag field into distinct, trimmed tags.
/// An empty field yields the placeholder tag.
pub fn split_tags(field: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let tags: Vec<String> = field
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_string()))
        .map(str::to_string)
        .collect();

    if tags.is_empty() {
        vec![TAG_PLACEHOLDER.to_string()]
    } else {
        tags
    }
}

/// Insert every tag used by `records`; existing descriptions are left alone
pub fn insert_tag_vocabulary(conn: &mut Connection, records: &[ShopRecord]) -> Result<usize> {
    let vocabulary: BTreeSet<String> = records
        .iter()
        .flat_map(|record| split_tags(&record.tags))
        .collect();

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tags (tag_description) VALUES (?1)
             ON CONFLICT(tag_description) DO NOTHING",
        )?;
        for tag in &vocabulary {
            inserted += stmt.execute([tag])?;
        }
    }
    tx.commit()?;

    debug!(vocabulary = vocabulary.len(), inserted, "tag vocabulary");
    Ok(inserted)
}

pub fn shop_exists(conn: &Connection, shop_id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM shops WHERE shop_id = ?1)",
        [shop_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn parse_collected(record: &ShopRecord) -> Result<(NaiveDate, NaiveTime)> {
    let invalid = || Error::InvalidTimestamp {
        shop_id: record.shop_id.clone(),
        value: format!("{} {}", record.date_collected, record.time_collected),
    };
    let date = NaiveDate::parse_from_str(record.date_collected.trim(), DATE_FORMAT)
        .map_err(|_| invalid())?;
    let time = NaiveTime::parse_from_str(record.time_collected.trim(), TIME_FORMAT)
        .map_err(|_| invalid())?;
    Ok((date, time))
}

fn non_empty_or_unknown(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        UNKNOWN
    } else {
        value
    }
}

fn insert_dimensions(tx: &Transaction, record: &ShopRecord) -> Result<()> {
    let state_name = match record.state_code {
        StateCode::Known(_) => non_empty_or_unknown(&record.state),
        StateCode::Unknown => UNKNOWN,
    };
    tx.execute(
        "INSERT INTO states (state_code, state_name) VALUES (?1, ?2)
         ON CONFLICT(state_code) DO NOTHING",
        params![record.state_code.db_key(), state_name],
    )?;
    tx.execute(
        "INSERT INTO districts (district_name) VALUES (?1)
         ON CONFLICT(district_name) DO NOTHING",
        [non_empty_or_unknown(&record.district)],
    )?;
    Ok(())
}

/// Load one shop and everything hanging off it in a single transaction.
/// Returns false when the shop was already present.
pub fn load_shop(conn: &mut Connection, record: &ShopRecord) -> Result<bool> {
    let tx = conn.transaction()?;

    if shop_exists(&tx, &record.shop_id)? {
        return Ok(false);
    }
    let (date, time) = parse_collected(record)?;

    insert_dimensions(&tx, record)?;

    // kept as published; the store only ever holds numeric strings here
    let latitude = Some(record.latitude.trim()).filter(|v| !v.is_empty());
    let longitude = Some(record.longitude.trim()).filter(|v| !v.is_empty());
    let coordinate_id: i64 = tx.query_row(
        "INSERT INTO coordinates (latitude, longitude) VALUES (?1, ?2) RETURNING coordinate_id",
        params![latitude, longitude],
        |row| row.get(0),
    )?;

    tx.execute(
        "INSERT INTO shops (shop_id, shopname, district_id, state_code, coordinate_id, googlemap_link)
         VALUES (?1, ?2, (SELECT district_id FROM districts WHERE district_name = ?3), ?4, ?5, ?6)",
        params![
            record.shop_id,
            record.shop_name,
            non_empty_or_unknown(&record.district),
            record.state_code.db_key(),
            coordinate_id,
            record.map_link,
        ],
    )?;

    for tag in split_tags(&record.tags) {
        let tag_id: i64 = tx
            .query_row(
                "SELECT tag_id FROM tags WHERE tag_description = ?1",
                [&tag],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::UnknownTag {
                shop_id: record.shop_id.clone(),
                tag: tag.clone(),
            })?;
        tx.execute(
            "INSERT INTO shop_tags (shop_id, tag_id) VALUES (?1, ?2)",
            params![record.shop_id, tag_id],
        )?;
    }

    tx.execute(
        "INSERT INTO social_media_links
         (shop_id, instagram_link, facebook_link, twitter_link, tiktok_link, whatsapp_link)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.shop_id,
            record.instagram_link,
            record.facebook_link,
            record.twitter_link,
            record.tiktok_link,
            record.whatsapp_link,
        ],
    )?;

    tx.execute(
        "INSERT INTO data_collection (shop_id, date_collected, time_collected) VALUES (?1, ?2, ?3)",
        params![
            record.shop_id,
            date.format("%Y-%m-%d").to_string(),
            time.format("%H:%M:%S").to_string(),
        ],
    )?;

    tx.commit()?;
    Ok(true)
}

/// Load every record of the store at `store_path`.
///
/// Store-level and connection-level failures abort the whole load. A failure
/// while loading one shop rolls back that shop only; it is logged with the
/// shop id and collected in the report.
pub fn load(store_path: &Path, conn: &mut Connection) -> Result<LoadReport> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    verify_schema(conn)?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for (i, row) in read_records(store_path)?.into_iter().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                // header is line 1
                let label = format!("line {}", i + 2);
                error!(row = %label, "malformed store row: {}", e);
                report.failed.push((label, e.to_string()));
            }
        }
    }

    insert_tag_vocabulary(conn, &records)?;

    for record in &records {
        match load_shop(conn, record) {
            Ok(true) => {
                debug!(shop_id = %record.shop_id, "loaded");
                report.loaded += 1;
            }
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(shop_id = %record.shop_id, "failed to load shop: {}", e);
                report.failed.push((record.shop_id.clone(), e.to_string()));
            }
        }
    }

    info!(
        loaded = report.loaded,
        skipped = report.skipped,
        failed = report.failed.len(),
        "load finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_database;

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn
    }

    fn record(id: &str, tags: &str) -> ShopRecord {
        ShopRecord {
            shop_id: id.to_string(),
            shop_name: format!("Kopi {}", id),
            tags: tags.to_string(),
            map_link: "https://maps.google.com/?q=3.1390,101.6869".to_string(),
            latitude: "3.1390".to_string(),
            longitude: "101.6869".to_string(),
            district: "Petaling".to_string(),
            state: "Selangor".to_string(),
            state_code: StateCode::Known(10),
            instagram_link: "https://instagram.com/kopi".to_string(),
            facebook_link: String::new(),
            twitter_link: String::new(),
            tiktok_link: String::new(),
            whatsapp_link: String::new(),
            date_collected: "09-03-2024".to_string(),
            time_collected: "14:05:07".to_string(),
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("WiFi, Halal"), vec!["WiFi", "Halal"]);
        assert_eq!(split_tags(" WiFi ,WiFi, "), vec!["WiFi"]);
        assert_eq!(split_tags(""), vec![TAG_PLACEHOLDER]);
        assert_eq!(split_tags(" , "), vec![TAG_PLACEHOLDER]);
    }

    #[test]
    fn test_load_shop_writes_every_table() {
        let mut conn = db();
        let shop = record("a", "WiFi, Halal");
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(load_shop(&mut conn, &shop).unwrap());

        assert_eq!(count(&conn, "shops"), 1);
        assert_eq!(count(&conn, "coordinates"), 1);
        assert_eq!(count(&conn, "shop_tags"), 2);
        assert_eq!(count(&conn, "social_media_links"), 1);
        assert_eq!(count(&conn, "data_collection"), 1);

        let (date, time): (String, String) = conn
            .query_row(
                "SELECT date_collected, time_collected FROM data_collection WHERE shop_id = 'a'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(date, "2024-03-09");
        assert_eq!(time, "14:05:07");

        let state: String = conn
            .query_row("SELECT state_name FROM states WHERE state_code = 10", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(state, "Selangor");

        let (latitude, longitude): (String, String) = conn
            .query_row("SELECT latitude, longitude FROM coordinates", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(latitude, "3.1390");
        assert_eq!(longitude, "101.6869");
    }

    #[test]
    fn test_existing_shop_is_skipped() {
        let mut conn = db();
        let shop = record("a", "WiFi");
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(load_shop(&mut conn, &shop).unwrap());
        assert!(!load_shop(&mut conn, &shop).unwrap());
        assert_eq!(count(&conn, "coordinates"), 1);
        assert_eq!(count(&conn, "data_collection"), 1);
    }

    #[test]
    fn test_unknown_tag_rolls_back_shop() {
        let mut conn = db();
        let shop = record("a", "WiFi, Halal");
        insert_tag_vocabulary(&mut conn, &[record("other", "WiFi")]).unwrap();

        match load_shop(&mut conn, &shop) {
            Err(Error::UnknownTag { shop_id, tag }) => {
                assert_eq!(shop_id, "a");
                assert_eq!(tag, "Halal");
            }
            other => panic!("expected unknown tag, got {:?}", other),
        }
        assert_eq!(count(&conn, "shops"), 0);
        assert_eq!(count(&conn, "coordinates"), 0);
        assert_eq!(count(&conn, "shop_tags"), 0);
    }

    #[test]
    fn test_unknown_state_uses_placeholder_row() {
        let mut conn = db();
        let mut shop = record("a", "");
        shop.state = UNKNOWN.to_string();
        shop.state_code = StateCode::Unknown;
        shop.district = String::new();
        shop.latitude = String::new();
        shop.longitude = String::new();
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(load_shop(&mut conn, &shop).unwrap());

        let (code, district, latitude): (i64, String, Option<String>) = conn
            .query_row(
                "SELECT s.state_code, d.district_name, c.latitude
                 FROM shops s
                 JOIN districts d ON d.district_id = s.district_id
                 JOIN coordinates c ON c.coordinate_id = s.coordinate_id",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(code, StateCode::UNKNOWN_ROW);
        assert_eq!(district, UNKNOWN);
        assert_eq!(latitude, None);

        let tag: String = conn
            .query_row(
                "SELECT t.tag_description FROM shop_tags st JOIN tags t ON t.tag_id = st.tag_id",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tag, TAG_PLACEHOLDER);
    }

    #[test]
    fn test_bad_timestamp_is_reported() {
        let mut conn = db();
        let mut shop = record("a", "WiFi");
        shop.date_collected = "2024/03/09".to_string();
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(matches!(
            load_shop(&mut conn, &shop),
            Err(Error::InvalidTimestamp { .. })
        ));
        assert_eq!(count(&conn, "shops"), 0);
    }

    #[test]
    fn test_loaded_shop_with_edited_timestamp_is_skipped() {
        let mut conn = db();
        let mut shop = record("a", "WiFi");
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(load_shop(&mut conn, &shop).unwrap());

        shop.time_collected = "later".to_string();
        assert!(!load_shop(&mut conn, &shop).unwrap());
        assert_eq!(count(&conn, "data_collection"), 1);
    }

    #[test]
    fn test_dimension_rows_from_interrupted_load_are_reused() {
        let mut conn = db();
        // a crash after the dimension inserts but before the shop row
        conn.execute(
            "INSERT INTO states (state_code, state_name) VALUES (10, 'Selangor')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO districts (district_name) VALUES ('Petaling')", [])
            .unwrap();
        conn.execute("INSERT INTO tags (tag_description) VALUES ('WiFi')", [])
            .unwrap();

        let shop = record("a", "WiFi");
        insert_tag_vocabulary(&mut conn, &[shop.clone()]).unwrap();
        assert!(load_shop(&mut conn, &shop).unwrap());

        assert_eq!(count(&conn, "states"), 1);
        assert_eq!(count(&conn, "districts"), 1);
        assert_eq!(count(&conn, "tags"), 1);
        assert_eq!(count(&conn, "shops"), 1);
    }

    #[test]
    fn test_missing_schema_is_fatal() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(verify_schema(&conn), Err(Error::SchemaMissing("states"))));
    }
}
