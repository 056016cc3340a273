use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use cache::testing::FaultyCache;
use catalog::{NewAccommodation, NewSpot, Spot};
use data_access::{CachePolicy, DataAccess};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("unable to connect to test db");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("unable to run migrations");

    pool
}

/// A database file shared by several connections, for tests that need
/// statements to interleave.
pub async fn file_data_access(name: &str) -> (DataAccess, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path = std::env::temp_dir().join(format!(
        "catalog-{name}-{}-{nanos}.db",
        std::process::id()
    ));

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("unable to open test db file");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("unable to run migrations");

    let cache = Arc::new(FaultyCache::new());
    (DataAccess::new(pool, cache, CachePolicy::default()), path)
}

pub fn remove_db(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub async fn data_access() -> (DataAccess, Arc<FaultyCache>) {
    let cache = Arc::new(FaultyCache::new());
    let data_access = DataAccess::new(pool().await, cache.clone(), CachePolicy::default());
    (data_access, cache)
}

pub fn new_spot(name: &str, city: &str) -> NewSpot {
    NewSpot {
        name: name.to_string(),
        description: format!("{name} in {city}"),
        city: city.to_string(),
        state: "RJ".to_string(),
        country: "Brasil".to_string(),
        latitude: -22.9,
        longitude: -43.2,
        address: "Centro".to_string(),
    }
}

pub fn new_accommodation(name: &str, kind: &str, avg_price: Option<f64>) -> NewAccommodation {
    NewAccommodation {
        name: name.to_string(),
        address: "Rua 1".to_string(),
        kind: kind.to_string(),
        phone: None,
        avg_price,
        booking_url: None,
    }
}

pub async fn spot(data_access: &DataAccess, name: &str, city: &str) -> Spot {
    catalog::spot::create(data_access, new_spot(name, city).validate().unwrap())
        .await
        .unwrap()
}
