//! Append-only CSV ledger of every shop ever collected

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::ShopRecord;
use crate::utils::clean_field;
use crate::{Error, Result};

const ID_COLUMN: &str = "Shop_ID";

/// Header and previously written shop ids of an existing store.
/// A missing or empty file has no header.
///
/// Rows cut short by an interrupted write still contribute their id, so a
/// shop is never written twice. Unreadable rows are logged and skipped.
#[derive(Debug, Default)]
pub struct StoreState {
    pub headers: Option<Vec<String>>,
    pub ids: HashSet<String>,
}

pub fn read_state(path: &Path) -> Result<StoreState> {
    if !has_content(path)? {
        return Ok(StoreState::default());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let index = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| Error::StoreWithoutId {
            path: path.display().to_string(),
            column: ID_COLUMN,
        })?;

    let mut ids = HashSet::new();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(path = %path.display(), "unreadable store row: {}", e);
                continue;
            }
        };
        if row.len() != headers.len() {
            warn!(
                line = row.position().map(|p| p.line()),
                fields = row.len(),
                expected = headers.len(),
                "truncated store row"
            );
        }
        match row.get(index).map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                ids.insert(id.to_string());
            }
            None => warn!(line = row.position().map(|p| p.line()), "store row without shop id"),
        }
    }

    Ok(StoreState {
        headers: Some(headers),
        ids,
    })
}

/// Append records whose shop id has never been written to the store.
///
/// Every text field is cleaned of line breaks first. Rows follow the column
/// order of the existing header; a header is written only when the file is
/// missing or empty. Returns the number of rows appended.
pub fn append_new(records: &[ShopRecord], path: &Path) -> Result<usize> {
    let state = read_state(path)?;
    let mut seen = state.ids;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)?;
    ensure_trailing_newline(&mut file)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    let headers = match state.headers {
        Some(headers) => headers,
        None => {
            writer.write_record(ShopRecord::HEADERS)?;
            ShopRecord::HEADERS.iter().map(|h| h.to_string()).collect()
        }
    };

    let mut appended = 0;
    for record in records {
        let record = record.clone().map_text(clean_field);
        if record.shop_id.is_empty() {
            debug!(shop_name = %record.shop_name, "record without shop id, skipping");
            continue;
        }
        if !seen.insert(record.shop_id.clone()) {
            debug!(shop_id = %record.shop_id, "already stored");
            continue;
        }
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.field(h).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
        appended += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), appended, "store updated");
    Ok(appended)
}

/// Every stored record in file order. The outer error means the store
/// itself could not be read; inner errors are individual malformed rows.
pub fn read_records(path: &Path) -> Result<Vec<Result<ShopRecord>>> {
    if !has_content(path)? {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    Ok(reader
        .deserialize::<ShopRecord>()
        .map(|row| row.map_err(Into::into))
        .collect())
}

fn has_content(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// A store whose last line was cut short must not swallow the next row
fn ensure_trailing_newline(file: &mut fs::File) -> Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}
