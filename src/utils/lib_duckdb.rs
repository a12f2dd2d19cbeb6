use std::fs;
use std::path::Path;

use duckdb::{AccessMode, Config, Connection};

use crate::error::EtlError;

/// Open (or create) a DuckDB file, creating the parent directory if needed.
pub fn open(duckdb_path: &Path) -> Result<Connection, EtlError> {
    if let Some(dir) = duckdb_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(Connection::open(duckdb_path)?)
}

/// Open an existing DuckDB file read-only.  Return [None] if the file
/// doesn't exist, nothing is created on disk.
pub fn open_read_only(duckdb_path: &Path) -> Result<Option<Connection>, EtlError> {
    if !duckdb_path.exists() {
        return Ok(None);
    }
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Ok(Some(Connection::open_with_flags(duckdb_path, config)?))
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, EtlError> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?;",
        [table],
        |row| row.get::<usize, i64>(0),
    )?;
    Ok(n > 0)
}

/// Quote a table name so it can be spliced into a SQL string.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
