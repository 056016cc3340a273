use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cache::{FilterParams, Resource, testing::FaultyCache};
use data_access::{CachePolicy, DataAccess, Error, InvalidationSet};
use serde::{Deserialize, Serialize};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const NOTES: Resource = Resource::new("note");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: i64,
    pub city: String,
    pub body: String,
}

pub struct Harness {
    pub data_access: DataAccess,
    pub cache: Arc<FaultyCache>,
    pub fetches: Arc<AtomicUsize>,
}

pub async fn pool() -> SqlitePool {
    // a single connection that never closes keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("unable to connect to test db");

    sqlx::query(
        r#"
        CREATE TABLE notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            city TEXT NOT NULL,
            body TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("unable to create notes table");

    pool
}

pub async fn harness() -> Harness {
    harness_with(CachePolicy::default()).await
}

pub async fn harness_with(policy: CachePolicy) -> Harness {
    let cache = Arc::new(FaultyCache::new());
    Harness {
        data_access: DataAccess::new(pool().await, cache.clone(), policy),
        cache,
        fetches: Arc::new(AtomicUsize::new(0)),
    }
}

impl Harness {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn get(&self, id: i64) -> Result<Note, Error> {
        self.data_access
            .read(NOTES.detail(id), |pool| {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                sqlx::query_as::<_, Note>("SELECT id, city, body FROM notes WHERE id = ?")
                    .bind(id)
                    .fetch_one(pool)
            })
            .await
    }

    pub async fn by_city(&self, city: &str) -> Result<Vec<Note>, Error> {
        let params = FilterParams::new().with("city", Some(city));
        let city = city.to_string();

        self.data_access
            .read(NOTES.list(&params), |pool| {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                sqlx::query_as::<_, Note>(
                    "SELECT id, city, body FROM notes WHERE city = ? ORDER BY id",
                )
                .bind(city)
                .fetch_all(pool)
            })
            .await
    }

    pub async fn create(&self, city: &str, body: &str) -> Result<Note, Error> {
        let (city, body) = (city.to_string(), body.to_string());

        self.data_access
            .write(
                |pool| {
                    sqlx::query_as::<_, Note>(
                        "INSERT INTO notes (city, body) VALUES (?, ?) RETURNING id, city, body",
                    )
                    .bind(city)
                    .bind(body)
                    .fetch_one(pool)
                },
                |note| InvalidationSet::entity(NOTES, note.id),
            )
            .await
    }

    pub async fn rewrite(&self, id: i64, body: &str) -> Result<Note, Error> {
        rewrite(&self.data_access, id, body).await
    }

    /// Changes a row behind the cache's back.
    pub async fn rewrite_unobserved(&self, id: i64, body: &str) {
        sqlx::query("UPDATE notes SET body = ? WHERE id = ?")
            .bind(body)
            .bind(id)
            .execute(self.data_access.pool())
            .await
            .expect("unable to update note");
    }

    pub async fn settle(&self, limit: Duration) {
        let started = tokio::time::Instant::now();
        while self.data_access.pending_invalidations() > 0 {
            assert!(
                started.elapsed() < limit,
                "invalidation retries still pending after {:?}",
                limit
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub async fn rewrite(data_access: &DataAccess, id: i64, body: &str) -> Result<Note, Error> {
    let body = body.to_string();

    data_access
        .write(
            |pool| {
                sqlx::query_as::<_, Note>(
                    "UPDATE notes SET body = ? WHERE id = ? RETURNING id, city, body",
                )
                .bind(body)
                .bind(id)
                .fetch_one(pool)
            },
            |note| InvalidationSet::entity(NOTES, note.id),
        )
        .await
}
