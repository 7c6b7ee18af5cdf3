//! SQLite-backed store for the dealership records.
//!
//! One [`Store`] owns one connection for the whole process. Every command
//! runs inside [`Store::transaction`], which commits when the closure
//! returns `Ok` and rolls back otherwise.

use crate::error::{Error, Result};
use diesel::{prelude::*, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub const DEFAULT_DATABASE: &str = "safari_motors.db";

pub struct Store {
    conn: SqliteConnection,
}

impl Store {
    /// Open (creating if needed) the database at `database_url` and bring
    /// its schema up to date.
    pub fn open(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)
            .map_err(|e| Error::Connection(e.to_string()))?;
        configure(&mut conn)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))?;
        info!(database = database_url, migrations = applied.len(); "store opened");
        Ok(Store { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Store::open(":memory:")
    }

    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        self.conn.transaction(f)
    }
}

fn configure(conn: &mut SqliteConnection) -> Result<()> {
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout = 5000").execute(conn)?;
    debug!("sqlite pragmas applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::sql_types::{BigInt, Text};

    #[derive(QueryableByName)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    #[derive(QueryableByName)]
    struct Flag {
        #[diesel(sql_type = BigInt)]
        foreign_keys: i64,
    }

    #[test]
    fn open_creates_all_tables() {
        let mut store = Store::in_memory().unwrap();
        let names: Vec<String> = store
            .transaction(|conn| {
                Ok(diesel::sql_query(
                    "SELECT name FROM sqlite_master WHERE type='table' \
                     AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' \
                     ORDER BY name",
                )
                .load::<TableName>(conn)?)
            })
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, ["cars", "customers", "employees", "sales"]);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let mut store = Store::in_memory().unwrap();
        let flag = store
            .transaction(|conn| Ok(diesel::sql_query("PRAGMA foreign_keys").get_result::<Flag>(conn)?))
            .unwrap();
        assert_eq!(flag.foreign_keys, 1);
    }

    #[test]
    fn reopening_a_file_keeps_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lot.db");
        let path = path.to_str().unwrap();

        Store::open(path).unwrap();
        assert!(Store::open(path).is_ok());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut store = Store::in_memory().unwrap();
        let outcome: Result<()> = store.transaction(|conn| {
            diesel::sql_query(
                "INSERT INTO customers (name, email, phone) VALUES ('Ann', 'ann@example.com', '1')",
            )
            .execute(conn)?;
            Err(Error::validation("name", "forced failure"))
        });
        assert!(outcome.is_err());

        let count: i64 = store
            .transaction(|conn| {
                Ok(crate::schema::customers::table.count().get_result(conn)?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
