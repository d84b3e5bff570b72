use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{SqliteDatabase, SqliteWallet};

/// Loads `.env.test`, initialises logging, and creates a fresh canteen database with the schema applied.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await
}

/// Creates a fresh wallet ledger database with the schema applied.
pub async fn prepare_wallet(url: &str) -> SqliteWallet {
    let _ = env_logger::try_init();
    create_database(url).await;
    let wallet = SqliteWallet::new_with_url(url, 5).await.expect("Error creating connection to wallet database");
    wallet.migrate().await.expect("Error running wallet migrations");
    info!("🚀️ Wallet migrations complete");
    wallet
}

/// A database URL in the system temp directory that no other test will use.
pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/canteen_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) -> SqliteDatabase {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Did not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}
