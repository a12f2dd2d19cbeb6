// Monthly average retail price of electricity by state and sector.
// https://www.eia.gov/opendata/browser/electricity/retail-sales

use std::path::Path;

use duckdb::{params, Connection};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    config::Config,
    error::EtlError,
    utils::lib_duckdb::{self, quote_identifier, table_exists},
};

use super::{
    lib_eia::RecordFetcher,
    retail_price::{newer_than, transform, Row},
};

/// Read the most recent month already stored.
pub trait WatermarkReader {
    /// Return [None] if the table doesn't exist or is empty.
    fn latest_month(&self, table: &str) -> Option<String>;
}

/// Append rows to a table, creating it if needed.
pub trait RowAppender {
    fn append_rows(&self, table: &str, rows: &[Row]) -> Result<usize, EtlError>;
}

impl WatermarkReader for Connection {
    fn latest_month(&self, table: &str) -> Option<String> {
        let query = format!("SELECT MAX(month) FROM {};", quote_identifier(table));
        match self.query_row(&query, [], |row| row.get::<usize, Option<String>>(0)) {
            Ok(Some(month)) if !month.is_empty() => Some(month),
            Ok(_) => {
                info!("Table {} is empty, starting fresh", table);
                None
            }
            Err(e) => {
                info!("Table {} not found, starting fresh ({})", table, e);
                None
            }
        }
    }
}

impl RowAppender for Connection {
    fn append_rows(&self, table: &str, rows: &[Row]) -> Result<usize, EtlError> {
        self.execute_batch(&format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    month VARCHAR,
    state VARCHAR,
    sector VARCHAR,
    price DOUBLE,
    units VARCHAR,
);
"#,
            quote_identifier(table)
        ))?;
        let mut appender = self.appender(table)?;
        for row in rows {
            appender.append_row(params![row.month, row.state, row.sector, row.price, row.units])?;
        }
        appender.flush()?;
        info!("Loaded {} new rows into table {}", rows.len(), table);
        Ok(rows.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Most recent month stored before the run
    pub watermark: Option<String>,
    /// Number of cleaned rows, before the watermark filter
    pub extracted: usize,
    /// Number of rows appended
    pub loaded: usize,
}

#[derive(Clone, Debug)]
pub struct EiaRetailPriceArchive {
    pub duckdb_path: String,
    pub table_name: String,
    pub states: Vec<String>,
}

impl EiaRetailPriceArchive {
    pub fn from_config(config: &Config) -> EiaRetailPriceArchive {
        EiaRetailPriceArchive {
            duckdb_path: config.duckdb_path().to_string_lossy().to_string(),
            table_name: config.database.table_name.clone(),
            states: config.api.facets.state.clone(),
        }
    }

    pub fn connect(&self) -> Result<Connection, EtlError> {
        lib_duckdb::open(Path::new(&self.duckdb_path))
    }

    /// Read-only connection, [None] if the DuckDB file doesn't exist yet.
    pub fn connect_read_only(&self) -> Result<Option<Connection>, EtlError> {
        lib_duckdb::open_read_only(Path::new(&self.duckdb_path))
    }

    /// Get the rows for all states, newer than the `watermark`.  States are
    /// fetched one after the other, in the order of the config.
    ///
    /// Also return the number of cleaned rows before the watermark filter.
    pub fn extract_new_rows<F: RecordFetcher>(
        &self,
        fetcher: &F,
        watermark: Option<&str>,
    ) -> Result<(Vec<Row>, usize), EtlError> {
        let mut all = Vec::new();
        let mut extracted = 0;
        for state in &self.states {
            info!("Extracting data for state: {}", state);
            let raw = fetcher.fetch(state, watermark)?;
            let cleaned = transform(&raw);
            extracted += cleaned.len();
            let rows = newer_than(cleaned, watermark);
            info!("  {} new rows for {}", rows.len(), state);
            all.extend(rows);
        }
        all.retain(|row| !row.month.is_empty());
        Ok((all, extracted))
    }

    /// Append the months not yet in the table.
    ///
    /// The watermark is advisory: nothing prevents duplicates if two runs
    /// overlap before the watermark moves.
    pub fn update_duckdb<F, S>(&self, fetcher: &F, store: &S) -> Result<RunSummary, EtlError>
    where
        F: RecordFetcher,
        S: WatermarkReader + RowAppender,
    {
        let watermark = store.latest_month(&self.table_name);
        info!(
            "Latest month in table {}: {}",
            self.table_name,
            watermark.as_deref().unwrap_or("none")
        );
        info!("Updating states: {}", self.states.iter().join(", "));

        let (rows, extracted) = self.extract_new_rows(fetcher, watermark.as_deref())?;
        if rows.is_empty() {
            warn!("No data extracted. Check your API key, it expires after a while!");
            return Ok(RunSummary {
                watermark,
                extracted,
                loaded: 0,
            });
        }

        let loaded = store.append_rows(&self.table_name, &rows)?;
        info!("Incremental ETL job finished. Records updated: {}", loaded);
        Ok(RunSummary {
            watermark,
            extracted,
            loaded,
        })
    }

    /// Get the first `limit` rows stored, ordered by month, state, sector.
    /// Empty if the table doesn't exist yet.
    pub fn get_data(&self, conn: &Connection, limit: usize) -> Result<Vec<Row>, EtlError> {
        if !table_exists(conn, &self.table_name)? {
            return Ok(Vec::new());
        }
        let query = format!(
            r#"
SELECT month, state, sector, price, units
FROM {}
ORDER BY month, state, sector
LIMIT {};
"#,
            quote_identifier(&self.table_name),
            limit
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Row {
                    month: row.get(0)?,
                    state: row.get(1)?,
                    sector: row.get(2)?,
                    price: row.get(3)?,
                    units: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<Row>, duckdb::Error>>()?;
        Ok(rows)
    }

    /// Number of rows stored for each sector.
    pub fn sector_counts(&self, conn: &Connection) -> Result<Vec<(String, i64)>, EtlError> {
        if !table_exists(conn, &self.table_name)? {
            return Ok(Vec::new());
        }
        let query = format!(
            r#"
SELECT sector, COUNT(*) AS n
FROM {}
GROUP BY sector
ORDER BY sector;
"#,
            quote_identifier(&self.table_name)
        );
        let mut stmt = conn.prepare(&query)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<usize, String>(0)?, row.get::<usize, i64>(1)?)))?
            .collect::<Result<Vec<_>, duckdb::Error>>()?;
        Ok(counts)
    }
}
