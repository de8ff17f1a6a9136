//! Relational warehouse loading for processed reviews.
//!
//! Bank names are upserted so each one gets a stable identifier; review rows
//! are appended on every load (at-least-once), so loading the same file twice
//! duplicates reviews but never banks.

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    data::{
        io,
        record::{CleanReview, OUTPUT_COLUMNS},
    },
    error::{PipelineError, Result},
};

/// Connection string selecting the in-process warehouse.
pub const MEMORY_URL: &str = "memory://";

/// Review row as stored, referencing its bank by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewInsert {
    pub bank_id: i64,
    pub review_text: String,
    pub rating: Option<u8>,
    pub review_date: NaiveDate,
    pub source: String,
}

/// Identifiers for every requested bank plus how many were new.
#[derive(Debug, Clone, Default)]
pub struct BankUpsert {
    pub ids: IndexMap<String, i64>,
    pub inserted: usize,
}

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub banks_inserted: usize,
    pub banks_seen: usize,
    pub reviews_inserted: usize,
}

/// Storage backend receiving processed reviews.
pub trait Warehouse {
    /// Insert names not yet present and return identifiers for all of them.
    fn upsert_banks(&mut self, names: &[String]) -> Result<BankUpsert>;

    /// Append review rows, returning the number written.
    fn insert_reviews(&mut self, rows: &[ReviewInsert]) -> Result<usize>;
}

/// Upsert the distinct banks of `reviews`, then bulk insert the reviews.
pub fn load_reviews<W>(warehouse: &mut W, reviews: &[CleanReview]) -> Result<LoadReport>
where
    W: Warehouse + ?Sized,
{
    let mut names: IndexMap<String, ()> = IndexMap::new();
    for review in reviews {
        names.entry(review.bank.clone()).or_insert(());
    }
    let names: Vec<String> = names.into_keys().collect();

    let upsert = warehouse.upsert_banks(&names)?;
    info!(inserted = upsert.inserted, seen = names.len(), "upserted banks");

    let rows = reviews
        .iter()
        .map(|review| {
            let bank_id = upsert.ids.get(&review.bank).copied().ok_or_else(|| {
                PipelineError::upstream(
                    "warehouse",
                    format!("no identifier returned for bank `{}`", review.bank),
                )
            })?;
            Ok(ReviewInsert {
                bank_id,
                review_text: review.review.clone(),
                rating: review.rating,
                review_date: review.date,
                source: review.source.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = warehouse.insert_reviews(&rows)?;
    info!(rows = inserted, "inserted reviews");
    Ok(LoadReport {
        banks_inserted: upsert.inserted,
        banks_seen: names.len(),
        reviews_inserted: inserted,
    })
}

/// Load the processed reviews file into the configured warehouse.
#[instrument(skip(settings))]
pub async fn run(settings: &Settings) -> anyhow::Result<LoadReport> {
    let path = settings.processed_reviews_path();
    load_file(&path, settings)
}

pub fn load_file(path: &Path, settings: &Settings) -> anyhow::Result<LoadReport> {
    let reviews: Vec<CleanReview> =
        io::read_rows(path, &OUTPUT_COLUMNS).context("reading processed reviews")?;
    let mut warehouse = open(settings).context("connecting to warehouse")?;
    let report = load_reviews(warehouse.as_mut(), &reviews).context("loading reviews")?;
    warn!(
        reviews = report.reviews_inserted,
        "review rows use at-least-once semantics; reloading the same file duplicates them"
    );
    Ok(report)
}

/// Open the warehouse named by `WAREHOUSE_URL`.
pub fn open(settings: &Settings) -> Result<Box<dyn Warehouse>> {
    let url = settings
        .warehouse_url
        .as_deref()
        .ok_or_else(|| PipelineError::Config("WAREHOUSE_URL is not set".into()))?;
    if url == MEMORY_URL {
        warn!("using in-memory warehouse; rows are discarded at exit");
        return Ok(Box::new(MemoryWarehouse::default()));
    }
    open_duckdb(url)
}

#[cfg(feature = "duckdb")]
fn open_duckdb(url: &str) -> Result<Box<dyn Warehouse>> {
    let store = DuckStore::open(url)?;
    store.bootstrap()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "duckdb"))]
fn open_duckdb(url: &str) -> Result<Box<dyn Warehouse>> {
    Err(PipelineError::Config(format!(
        "cannot open `{url}`: built without the `duckdb` feature"
    )))
}

/// Warehouse kept in process memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    pub banks: IndexMap<String, i64>,
    pub reviews: Vec<ReviewInsert>,
}

impl Warehouse for MemoryWarehouse {
    fn upsert_banks(&mut self, names: &[String]) -> Result<BankUpsert> {
        let mut upsert = BankUpsert::default();
        for name in names {
            let next_id = self.banks.len() as i64 + 1;
            let id = *self.banks.entry(name.clone()).or_insert_with(|| {
                upsert.inserted += 1;
                next_id
            });
            upsert.ids.insert(name.clone(), id);
        }
        Ok(upsert)
    }

    fn insert_reviews(&mut self, rows: &[ReviewInsert]) -> Result<usize> {
        self.reviews.extend_from_slice(rows);
        Ok(rows.len())
    }
}

#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

#[cfg(feature = "duckdb")]
mod duck {
    use std::{collections::HashMap, path::PathBuf};

    use duckdb::{params, Connection};
    use tracing::info;

    use super::{BankUpsert, ReviewInsert, Warehouse};
    use crate::error::{PipelineError, Result};

    const SCHEMA: &str = "
        CREATE SEQUENCE IF NOT EXISTS bank_seq START 1;
        CREATE SEQUENCE IF NOT EXISTS review_seq START 1;
        CREATE TABLE IF NOT EXISTS banks (
            bank_id BIGINT PRIMARY KEY DEFAULT nextval('bank_seq'),
            bank_name VARCHAR NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS reviews (
            review_id BIGINT PRIMARY KEY DEFAULT nextval('review_seq'),
            bank_id BIGINT NOT NULL REFERENCES banks (bank_id),
            review_text VARCHAR NOT NULL,
            rating INTEGER,
            review_date DATE NOT NULL,
            source VARCHAR NOT NULL
        );";

    /// Wrapper around a DuckDB connection holding the review warehouse.
    pub struct DuckStore {
        pub conn: Connection,
        pub db_path: Option<PathBuf>,
    }

    impl DuckStore {
        /// Open (or create) a database from a `duckdb://<path>` or bare path URL.
        pub fn open(url: &str) -> Result<Self> {
            let target = url.strip_prefix("duckdb://").unwrap_or(url);
            if target.is_empty() || target == ":memory:" {
                let conn = Connection::open_in_memory().map_err(warehouse_error)?;
                return Ok(Self {
                    conn,
                    db_path: None,
                });
            }
            let db_path = PathBuf::from(target);
            let conn = Connection::open(&db_path).map_err(warehouse_error)?;
            info!(path = %db_path.display(), "opened duckdb");
            Ok(Self {
                conn,
                db_path: Some(db_path),
            })
        }

        /// Create the banks/reviews tables and their id sequences.
        pub fn bootstrap(&self) -> Result<()> {
            self.conn.execute_batch(SCHEMA).map_err(warehouse_error)
        }

        pub fn count(&self, table: &str) -> Result<i64> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .map_err(warehouse_error)
        }

        /// Run `work` inside a transaction, rolling back before returning any error.
        fn in_transaction<T>(
            &self,
            work: impl FnOnce(&Connection) -> duckdb::Result<T>,
        ) -> Result<T> {
            self.conn
                .execute_batch("BEGIN TRANSACTION")
                .map_err(warehouse_error)?;
            match work(&self.conn) {
                Ok(value) => {
                    self.conn.execute_batch("COMMIT").map_err(warehouse_error)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                        tracing::error!(%rollback, "rollback failed");
                    }
                    Err(warehouse_error(err))
                }
            }
        }
    }

    impl Warehouse for DuckStore {
        fn upsert_banks(&mut self, names: &[String]) -> Result<BankUpsert> {
            self.in_transaction(|conn| {
                let existing = bank_ids(conn)?;
                let mut inserted = 0;
                for name in names.iter().filter(|name| !existing.contains_key(*name)) {
                    conn.execute("INSERT INTO banks (bank_name) VALUES (?)", params![name])?;
                    inserted += 1;
                }

                let existing = bank_ids(conn)?;
                let ids = names
                    .iter()
                    .filter_map(|name| existing.get(name).map(|id| (name.clone(), *id)))
                    .collect();
                Ok(BankUpsert { ids, inserted })
            })
        }

        fn insert_reviews(&mut self, rows: &[ReviewInsert]) -> Result<usize> {
            self.in_transaction(|conn| {
                let mut stmt = conn.prepare(
                    "INSERT INTO reviews (bank_id, review_text, rating, review_date, source) \
                     VALUES (?, ?, ?, CAST(? AS DATE), ?)",
                )?;
                let mut written = 0;
                for row in rows {
                    written += stmt.execute(params![
                        row.bank_id,
                        row.review_text,
                        row.rating.map(i32::from),
                        row.review_date.format("%Y-%m-%d").to_string(),
                        row.source,
                    ])?;
                }
                Ok(written)
            })
        }
    }

    fn bank_ids(conn: &Connection) -> duckdb::Result<HashMap<String, i64>> {
        let mut stmt = conn.prepare("SELECT bank_name, bank_id FROM banks")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect()
    }

    fn warehouse_error(err: duckdb::Error) -> PipelineError {
        PipelineError::upstream("warehouse", err)
    }
}
