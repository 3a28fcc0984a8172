//! # SQLite Database methods
//!
//! Low-level SQLite interactions, as plain functions that accept a `&mut SqliteConnection`. Callers either take a
//! connection from the pool or open a transaction and pass `&mut *tx`.
use std::env;

use log::*;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Error as SqlxError, Sqlite, SqlitePool};

pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/upi_store.db";

pub fn db_url() -> String {
    let result = env::var("UPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ UPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates an empty database file at `url` if there isn't one already.
pub async fn create_database_if_missing(url: &str) -> Result<(), SqlxError> {
    if !Sqlite::database_exists(url).await? {
        info!("🗃️ Creating new SQLite database at {url}");
        Sqlite::create_database(url).await?;
    }
    Ok(())
}
