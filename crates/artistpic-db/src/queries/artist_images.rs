//! Artist image cache queries.
//!
//! Lookup, upsert, and counting for the `artist_images` table. Rows are keyed
//! by the normalized artist name; every function here derives that key with
//! [`normalize_key`] so the read and write paths can never disagree.

use artistpic_common::{from_unix_seconds, normalize_key, CachedImageRecord, Error, Result};
use rusqlite::{Connection, OptionalExtension};

/// Parse a record from a database row.
///
/// Expects columns in order: artist_name, image_key, url, source, fetched_at.
fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<CachedImageRecord> {
    Ok(CachedImageRecord {
        artist_name: row.get(0)?,
        image_key: row.get(1)?,
        url: row.get(2)?,
        source: row.get(3)?,
        fetched_at: from_unix_seconds(row.get(4)?),
    })
}

/// Get the cached record for an artist.
///
/// The name is normalized before lookup, so any casing or surrounding
/// whitespace variant finds the same row. No TTL is applied here.
///
/// # Returns
///
/// * `Ok(Some(CachedImageRecord))` - The record if present
/// * `Ok(None)` - If nothing is cached for this artist
/// * `Err(Error)` - If a database error occurs
pub fn get_by_name(conn: &Connection, artist_name: &str) -> Result<Option<CachedImageRecord>> {
    conn.query_row(
        "SELECT artist_name, image_key, url, source, fetched_at
         FROM artist_images
         WHERE artist_name_lower = :key",
        rusqlite::named_params! { ":key": normalize_key(artist_name) },
        parse_record_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Insert a record or replace the one sharing its normalized key.
///
/// A single `INSERT ... ON CONFLICT DO UPDATE` statement, so readers see
/// either the old row or the new one and never a mix.
///
/// # Errors
///
/// * `Error::InvalidInput` - If the artist name is blank or the URL is empty
/// * `Error::Database` - If the write fails
pub fn upsert(conn: &Connection, record: &CachedImageRecord) -> Result<()> {
    let key = record.normalized_key();
    if key.is_empty() {
        return Err(Error::invalid_input("artist name must not be blank"));
    }
    if record.url.is_empty() {
        return Err(Error::invalid_input(format!(
            "refusing to cache an empty URL for '{}'",
            record.artist_name
        )));
    }

    conn.execute(
        "INSERT INTO artist_images (artist_name_lower, artist_name, image_key, url, source, fetched_at)
         VALUES (:key, :artist_name, :image_key, :url, :source, :fetched_at)
         ON CONFLICT(artist_name_lower) DO UPDATE SET
            artist_name = excluded.artist_name,
            image_key = excluded.image_key,
            url = excluded.url,
            source = excluded.source,
            fetched_at = excluded.fetched_at",
        rusqlite::named_params! {
            ":key": key,
            ":artist_name": &record.artist_name,
            ":image_key": &record.image_key,
            ":url": &record.url,
            ":source": &record.source,
            ":fetched_at": record.fetched_at_unix(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Count distinct cached artists.
pub fn count(conn: &Connection) -> Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM artist_images", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n as u64)
    .map_err(|e| Error::database(e.to_string()))
}

/// List the most recently fetched records, newest first.
pub fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<CachedImageRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT artist_name, image_key, url, source, fetched_at
             FROM artist_images
             ORDER BY fetched_at DESC, artist_name_lower ASC
             LIMIT :limit",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map(rusqlite::named_params! { ":limit": limit }, parse_record_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}
