use std::sync::Arc;

use axum::{body::Body, http::Response};
use cache::testing::FaultyCache;
use data_access::{CachePolicy, DataAccess};
use server::{AdminToken, AppState};
use sqlx::sqlite::SqlitePoolOptions;

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub async fn state() -> (AppState, Arc<FaultyCache>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("unable to connect to test db");

    server::migrate(&pool)
        .await
        .expect("unable to run migrations");

    let cache = Arc::new(FaultyCache::new());
    let state = AppState {
        data_access: DataAccess::new(pool, cache.clone(), CachePolicy::default()),
        admin_token: AdminToken::new(ADMIN_TOKEN),
    };

    (state, cache)
}

pub async fn json(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("unable to read response body");

    serde_json::from_slice(&body).expect("unable to deserialize response body")
}

static TRACING_INIT: std::sync::Once = std::sync::Once::new();

pub fn tracing_init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}
