//! SQLite adapter for the collectors' tables.
//!
//! Reads `chart_data` and `youtube_videos` into raw records and writes the
//! unified dataset back as a single table. SQLite is dynamically typed, so
//! every column is read through [`ValueRef`] and converted into the lenient
//! raw form; coercion happens later in the pipeline.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{RawChartRecord, RawVideoRecord, UnifiedRecord};
use crate::safety::validate_table_name;

pub const CHART_TABLE: &str = "chart_data";
pub const VIDEO_TABLE: &str = "youtube_videos";
pub const DEFAULT_OUTPUT_TABLE: &str = "cleaned_music_data";

const CHART_COLUMNS: &[&str] = &[
    "position",
    "track_name",
    "artist_name",
    "chart_name",
    "chart_date",
    "additional_info",
];

const VIDEO_COLUMNS: &[&str] = &[
    "video_id",
    "title",
    "channel_title",
    "view_count",
    "like_count",
    "comment_count",
    "duration",
    "tags",
    "published_at",
];

/// Open an existing database. Never creates a file.
pub fn open_database(path: &Path, read_only: bool) -> Result<Connection> {
    let access = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
    };
    let conn = Connection::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
    Ok(conn)
}

// ============================================================================
// Value conversion
// ============================================================================

/// Any SQLite value as JSON. Text stays a string; parsing is the pipeline's job.
fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Any SQLite value as text.
fn to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn json_at(row: &Row<'_>, idx: usize) -> Result<Option<Value>> {
    Ok(match to_json(row.get_ref(idx)?) {
        Value::Null => None,
        v => Some(v),
    })
}

fn text_at(row: &Row<'_>, idx: usize) -> Result<Option<String>> {
    Ok(to_text(row.get_ref(idx)?))
}

// ============================================================================
// Reading
// ============================================================================

fn table_columns(conn: &Connection, table: &str) -> Result<FxHashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<FxHashSet<_>, _>>()?;
    Ok(columns)
}

/// SELECT for `wanted` columns of `table`, with NULL standing in for columns
/// the table does not have. `None` when the table itself is missing.
fn select_sql(conn: &Connection, table: &str, wanted: &[&str]) -> Result<Option<String>> {
    let present = table_columns(conn, table)?;
    if present.is_empty() {
        warn!(table, "source table not found, reading no records");
        return Ok(None);
    }

    let list: Vec<String> = wanted
        .iter()
        .map(|col| {
            if present.contains(*col) {
                format!("\"{col}\"")
            } else {
                warn!(table, column = col, "column missing, reading as NULL");
                format!("NULL AS \"{col}\"")
            }
        })
        .collect();
    // rowid keeps the collectors' insertion order
    Ok(Some(format!(
        "SELECT {} FROM \"{}\" ORDER BY rowid",
        list.join(", "),
        table
    )))
}

pub fn read_chart_records(conn: &Connection) -> Result<Vec<RawChartRecord>> {
    let Some(sql) = select_sql(conn, CHART_TABLE, CHART_COLUMNS)? else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(RawChartRecord {
            position: json_at(row, 0)?,
            track_name: text_at(row, 1)?,
            artist_name: text_at(row, 2)?,
            chart_name: text_at(row, 3)?,
            chart_date: text_at(row, 4)?,
            additional_info: json_at(row, 5)?,
        });
    }

    info!(table = CHART_TABLE, count = records.len(), "read chart records");
    Ok(records)
}

pub fn read_video_records(conn: &Connection) -> Result<Vec<RawVideoRecord>> {
    let Some(sql) = select_sql(conn, VIDEO_TABLE, VIDEO_COLUMNS)? else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(RawVideoRecord {
            video_id: text_at(row, 0)?,
            title: text_at(row, 1)?,
            channel_title: text_at(row, 2)?,
            view_count: json_at(row, 3)?,
            like_count: json_at(row, 4)?,
            comment_count: json_at(row, 5)?,
            duration: text_at(row, 6)?,
            tags: json_at(row, 7)?,
            published_at: text_at(row, 8)?,
        });
    }

    info!(table = VIDEO_TABLE, count = records.len(), "read video records");
    Ok(records)
}

// ============================================================================
// Writing
// ============================================================================

/// Replace `table` with the unified records, in one transaction.
/// Returns the number of rows written.
pub fn write_unified_records(
    conn: &mut Connection,
    table: &str,
    records: &[UnifiedRecord],
) -> Result<usize> {
    validate_table_name(table)?;

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{table}\";
        CREATE TABLE \"{table}\" (
            id INTEGER PRIMARY KEY,
            track_name TEXT NOT NULL,
            artist_name TEXT NOT NULL,
            source TEXT NOT NULL,
            chart_name TEXT,
            chart_position INTEGER,
            chart_date TEXT,
            additional_info TEXT,
            video_id TEXT,
            view_count INTEGER,
            like_count INTEGER,
            comment_count INTEGER,
            duration_seconds INTEGER,
            tags TEXT,
            published_at TEXT,
            original_title TEXT NOT NULL,
            original_artist TEXT NOT NULL
        );"
    ))?;

    {
        let mut stmt = tx.prepare_cached(&format!(
            "INSERT INTO \"{table}\" (track_name, artist_name, source, chart_name, chart_position,
                chart_date, additional_info, video_id, view_count, like_count, comment_count,
                duration_seconds, tags, published_at, original_title, original_artist)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ))?;

        for r in records {
            let additional_info = r.additional_info.as_ref().map(serde_json::to_string).transpose()?;
            let tags = r.tags.as_ref().map(serde_json::to_string).transpose()?;
            stmt.execute(params![
                r.track_name,
                r.artist_name,
                r.source.as_str(),
                r.chart_name,
                r.chart_position,
                r.chart_date,
                additional_info,
                r.video_id,
                r.view_count,
                r.like_count,
                r.comment_count,
                r.duration_seconds,
                tags,
                r.published_at,
                r.original_title,
                r.original_artist,
            ])?;
        }
    }
    tx.commit()?;

    info!(table, rows = records.len(), "wrote unified table");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use serde_json::json;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE chart_data (
                id INTEGER PRIMARY KEY,
                track_name TEXT, artist_name TEXT, position INTEGER,
                chart_name TEXT, chart_date TEXT, additional_info TEXT
            );
            CREATE TABLE youtube_videos (
                id INTEGER PRIMARY KEY,
                video_id TEXT, title TEXT, channel_title TEXT,
                view_count INTEGER, like_count INTEGER, comment_count INTEGER,
                duration TEXT, tags TEXT, published_at TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_read_chart_records_lenient_types() {
        let conn = memory_db();
        conn.execute_batch(
            "INSERT INTO chart_data (track_name, artist_name, position, chart_name, additional_info)
             VALUES ('Levitating', 'Dua Lipa', 3, 'Hot 100', '{\"peak\": 1}');
             INSERT INTO chart_data (track_name, artist_name, position)
             VALUES ('Hello', 'Adele', 'n/a');",
        )
        .unwrap();

        let records = read_chart_records(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position, Some(json!(3)));
        assert_eq!(records[0].additional_info, Some(json!("{\"peak\": 1}")));
        assert_eq!(records[1].position, Some(json!("n/a")));
        assert_eq!(records[1].chart_name, None);
    }

    #[test]
    fn test_read_video_records() {
        let conn = memory_db();
        conn.execute_batch(
            "INSERT INTO youtube_videos (video_id, title, channel_title, view_count, duration, tags)
             VALUES ('abc', 'Adele - Hello', 'AdeleVEVO', 1500, 'PT6M7S', '[\"pop\"]');",
        )
        .unwrap();

        let records = read_video_records(&conn).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].video_id.as_deref(), Some("abc"));
        assert_eq!(records[0].view_count, Some(json!(1500)));
        assert_eq!(records[0].like_count, None);
        assert_eq!(records[0].tags, Some(json!("[\"pop\"]")));
    }

    #[test]
    fn test_missing_tables_and_columns() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(read_chart_records(&conn).unwrap().is_empty());
        assert!(read_video_records(&conn).unwrap().is_empty());

        conn.execute_batch(
            "CREATE TABLE chart_data (track_name TEXT, artist_name TEXT);
             INSERT INTO chart_data VALUES ('Song', 'Artist');",
        )
        .unwrap();
        let records = read_chart_records(&conn).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, None);
        assert_eq!(records[0].track_name.as_deref(), Some("Song"));
    }

    #[test]
    fn test_write_replaces_table() {
        let mut conn = memory_db();
        let record = UnifiedRecord {
            track_name: "Levitating".to_string(),
            artist_name: "Dua Lipa".to_string(),
            source: Source::Video,
            chart_name: None,
            chart_position: None,
            chart_date: None,
            additional_info: None,
            video_id: Some("abc".to_string()),
            view_count: Some(10),
            like_count: None,
            comment_count: None,
            duration_seconds: Some(203),
            tags: Some(vec!["pop".to_string(), "dance".to_string()]),
            published_at: None,
            original_title: "Dua Lipa - Levitating".to_string(),
            original_artist: "Dua Lipa".to_string(),
        };

        write_unified_records(&mut conn, DEFAULT_OUTPUT_TABLE, &[record.clone(), record.clone()]).unwrap();
        assert_eq!(write_unified_records(&mut conn, DEFAULT_OUTPUT_TABLE, &[record]).unwrap(), 1);

        let (count, source, tags): (i64, String, String) = conn
            .query_row(
                "SELECT COUNT(*), MAX(source), MAX(tags) FROM cleaned_music_data",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(source, "video");
        assert_eq!(tags, "[\"pop\",\"dance\"]");
    }

    #[test]
    fn test_write_rejects_bad_table_name() {
        let mut conn = memory_db();
        assert!(write_unified_records(&mut conn, "x\"; DROP TABLE chart_data; --", &[]).is_err());
    }
}
