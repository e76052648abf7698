//! SQLite database with Diesel ORM
//!
//! Creates the behavior schema on open, seeds the lookup tables and exposes
//! typed insert/query operations per entity. Foreign keys, cascades and the
//! stimulus exclusivity rule are enforced by SQLite itself.

mod acquisition;
mod calibration;
pub mod ddl;
mod lookup;
pub mod models;

pub use acquisition::{SessionDeletion, SessionSummary};
pub use lookup::{default_tasks, EXPERIMENT_TYPES};
pub use models::*;

pub use crate::error::{DbError, Result};

use crate::catalog;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "behavior.db";

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub(crate) type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas. Foreign keys are off by default in SQLite.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Helper for raw SQL count queries
#[derive(QueryableByName)]
struct CountResult {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    count: i64,
}

impl Database {
    /// Open database at default path
    pub fn open() -> Result<Self> {
        Self::open_at(DEFAULT_DB_PATH)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tracing::info!("opened behavior database at {}", path_str);
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database.
    ///
    /// Each SQLite connection to `:memory:` is its own database, so the pool
    /// holds exactly one connection and never recycles it.
    pub fn open_in_memory() -> Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    pub(crate) fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        conn.transaction::<_, DbError, _>(|conn| {
            for stmt in ddl::all_schema_statements() {
                diesel::sql_query(stmt).execute(conn)?;
            }
            Ok(())
        })?;
        tracing::debug!("schema ready ({} tables)", catalog::TABLES.len());

        lookup::seed(&mut conn)?;
        Ok(())
    }

    /// Row count for every table in the catalog, in catalog order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut conn = self.get_conn()?;
        let mut counts = Vec::with_capacity(catalog::TABLES.len());

        for table in catalog::TABLES {
            // Names come from the static catalog, never from input
            let row = diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {}", table.name))
                .get_result::<CountResult>(&mut conn)?;
            counts.push((table.name, row.count));
        }

        Ok(counts)
    }

    /// Names of the tables present in the database file
    pub fn existing_tables(&self) -> Result<Vec<String>> {
        #[derive(QueryableByName)]
        struct NameRow {
            #[diesel(sql_type = diesel::sql_types::Text)]
            name: String,
        }

        let mut conn = self.get_conn()?;
        let rows = diesel::sql_query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .load::<NameRow>(&mut conn)?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_all_catalog_tables_created() {
        let db = db();
        let existing = db.existing_tables().unwrap();
        for table in catalog::TABLES {
            assert!(existing.iter().any(|t| t == table.name), "missing table {}", table.name);
        }
    }

    #[test]
    fn test_table_counts_after_init() {
        let db = db();
        let counts = db.table_counts().unwrap();
        assert_eq!(counts.len(), catalog::TABLES.len());

        for (name, count) in counts {
            let expected = match name {
                "experiment_type" => 5,
                "task" => 1,
                _ => 0,
            };
            assert_eq!(count, expected, "unexpected row count in {}", name);
        }
    }

    #[test]
    fn test_foreign_keys_enabled_on_pooled_connection() {
        #[derive(QueryableByName)]
        struct Pragma {
            #[diesel(sql_type = diesel::sql_types::Integer)]
            foreign_keys: i32,
        }

        let db = db();
        let mut conn = db.get_conn().unwrap();
        let pragma = diesel::sql_query("PRAGMA foreign_keys").get_result::<Pragma>(&mut conn).unwrap();
        assert_eq!(pragma.foreign_keys, 1);
    }

    #[test]
    fn test_reopen_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("behavior.db");

        {
            let db = Database::open_at(&path).unwrap();
            session(&db, 1, 1);
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.experiment_types().unwrap().len(), 5);
        assert_eq!(db.tasks().unwrap().len(), 1);
        assert_eq!(db.sessions(1).unwrap().len(), 1);
    }
}
