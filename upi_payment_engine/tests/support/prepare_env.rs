use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use upi_payment_engine::{traits::OrderStore, SqliteDatabase};

pub fn random_db_path() -> String {
    format!("sqlite://{}/upi_test_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("🚀️ Nothing to drop at {url}: {e:?}");
    }
    SqliteDatabase::open(url, 5).await.expect("Error creating test database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop test database {url}: {e}");
    }
}
