mod admin;
mod api;
mod middleware;
mod span;

use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use axum::{Router, extract::FromRef, middleware::from_fn, routing::get};
use cache::{CacheBackend, MemoryCache, RedisCache};
use contextual::Context;
use data_access::{CachePolicy, DataAccess};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use tokio::{net::TcpListener, time::MissedTickBehavior};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use admin::{Admin, AdminError, AdminToken};

#[derive(Debug)]
pub struct ServerOpts {
    pub database_url: String,
    pub port: u16,
    pub admin_token: AdminToken,
    pub cache: CachePolicy,
    /// Cache in Redis at this URL instead of in process memory.
    pub redis_url: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub data_access: DataAccess,
    pub admin_token: AdminToken,
}

pub fn server(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(from_fn(middleware::mw_client_ip))
        .layer(TraceLayer::new_for_http().make_span_with(span::span))
        .layer(from_fn(middleware::latency_ms))
        .layer(from_fn(middleware::mw_handle_leaked_5xx));

    Router::new()
        .route(api::health::PATH, get(api::health::handler))
        .route(
            api::spots::PATH,
            get(api::spots::list).post(api::spots::create),
        )
        .route(
            api::spots::ITEM_PATH,
            get(api::spots::get)
                .put(api::spots::update)
                .delete(api::spots::delete),
        )
        .route(
            api::accommodations::SPOT_PATH,
            get(api::accommodations::list).post(api::accommodations::create),
        )
        .route(
            api::accommodations::ITEM_PATH,
            get(api::accommodations::get)
                .put(api::accommodations::update)
                .delete(api::accommodations::delete),
        )
        .with_state(state)
        .layer(middleware)
}

/// Opens the store of record, creating the SQLite file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, contextual::Error<sqlx::Error>> {
    let options = SqliteConnectOptions::from_str(database_url)
        .context(format!("parse database url :: {database_url}"))?
        .create_if_missing(true);

    SqlitePool::connect_with(options)
        .await
        .context(format!("connect database :: {database_url}"))
}

pub async fn migrate(
    pool: &SqlitePool,
) -> Result<(), contextual::Error<sqlx::migrate::MigrateError>> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .context("run migrations")
}

pub async fn serve(opts: ServerOpts) -> Result<(), ServerError> {
    tracing::info!(
        port = opts.port,
        database_url = %opts.database_url,
        cache = ?opts.cache,
        redis = opts.redis_url.is_some(),
        "starting"
    );

    let pool = connect(&opts.database_url).await?;
    migrate(&pool).await?;

    let cache = open_cache(opts.redis_url.as_deref(), &opts.cache).await?;

    let state = AppState {
        data_access: DataAccess::new(pool, cache, opts.cache),
        admin_token: opts.admin_token,
    };

    let app = server(state).into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([127, 0, 0, 1], opts.port));
    let listener = TcpListener::bind(addr)
        .await
        .context(format!("bind :: {addr}"))?;
    tracing::info!(
        "listening on {}",
        listener.local_addr().context("local_addr")?
    );
    axum::serve(listener, app)
        .await
        .context("axum::serve")
        .map_err(|e| e.into())
}

/// Redis when `redis_url` is given, otherwise an in-memory cache with a
/// background purge of expired entries.
pub async fn open_cache(
    redis_url: Option<&str>,
    policy: &CachePolicy,
) -> Result<Arc<dyn CacheBackend>, contextual::Error<cache::CacheError>> {
    match redis_url {
        Some(url) => {
            let redis = RedisCache::connect(url).await.context("connect redis")?;
            Ok(Arc::new(redis))
        }
        None => {
            let memory = Arc::new(MemoryCache::new());
            spawn_cache_purge(Arc::clone(&memory), policy.list_ttl);
            Ok(memory)
        }
    }
}

/// Drops expired entries that were never read again.
fn spawn_cache_purge(cache: Arc<MemoryCache>, every: Duration) {
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "purged expired cache entries");
            }
        }
    });
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Sqlx(#[from] contextual::Error<sqlx::Error>),

    #[error("{0}")]
    Migrate(#[from] contextual::Error<sqlx::migrate::MigrateError>),

    #[error("{0}")]
    Io(#[from] contextual::Error<std::io::Error>),

    #[error("{0}")]
    Cache(#[from] contextual::Error<cache::CacheError>),
}

impl FromRef<AppState> for DataAccess {
    fn from_ref(input: &AppState) -> Self {
        input.data_access.clone()
    }
}

impl FromRef<AppState> for AdminToken {
    fn from_ref(input: &AppState) -> Self {
        input.admin_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_without_redis_url() {
        let cache = open_cache(None, &CachePolicy::default()).await.unwrap();

        cache
            .set("spot:detail:1", b"{}".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(cache.get("spot:detail:1").await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn bad_redis_url_fails_startup() {
        let err = open_cache(Some("not a url"), &CachePolicy::default())
            .await
            .err()
            .unwrap();

        assert_eq!(err.context(), "connect redis");
        assert!(matches!(err.inner(), cache::CacheError::Unavailable(_)));
    }
}
