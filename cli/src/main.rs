use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use data_access::CachePolicy;
use tracing_subscriber::EnvFilter;

use server::{AdminToken, ServerOpts, serve};

#[derive(Debug, Parser)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the server with the specified configuration.
    Server {
        /// The port number on which the server will listen for incoming connections.
        /// Example: `8080`
        #[arg(long, env = "PORT")]
        port: u16,

        /// The database connection URL used by the server.
        /// Example: `sqlite:///tmp/data/data.db` (or) `sqlite://./data.db`
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Token expected in `Authorization: Token <admin-token>` on every
        /// create, update and delete request.
        #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
        admin_token: AdminToken,

        /// Redis server to cache in. Without it entries are kept in process memory.
        /// Example: `redis://127.0.0.1:6379/0`
        #[arg(long, env = "REDIS_URL")]
        redis_url: Option<String>,

        /// Lifetime of cached single spot/accommodation snapshots.
        #[arg(long, env = "CACHE_DETAIL_TTL_SECS", default_value_t = 300)]
        detail_ttl_secs: u64,

        /// Lifetime of cached list and search results.
        #[arg(long, env = "CACHE_LIST_TTL_SECS", default_value_t = 60)]
        list_ttl_secs: u64,

        /// Upper bound on a single cache call before falling back to the database.
        #[arg(long, env = "CACHE_TIMEOUT_MS", default_value_t = 250)]
        cache_timeout_ms: u64,

        /// First delay before retrying a failed invalidation. Doubles on each attempt.
        #[arg(long, env = "CACHE_RETRY_BACKOFF_MS", default_value_t = 100)]
        retry_backoff_ms: u64,
    },

    /// Apply pending database migrations and exit.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Args::parse().cmd {
        Command::Server {
            port,
            database_url,
            admin_token,
            redis_url,
            detail_ttl_secs,
            list_ttl_secs,
            cache_timeout_ms,
            retry_backoff_ms,
        } => {
            let cache = CachePolicy::default()
                .with_detail_ttl(Duration::from_secs(detail_ttl_secs))
                .with_list_ttl(Duration::from_secs(list_ttl_secs))
                .with_backend_timeout(Duration::from_millis(cache_timeout_ms))
                .with_retry_backoff(
                    Duration::from_millis(retry_backoff_ms),
                    CachePolicy::default().retry_backoff_max,
                );

            serve(ServerOpts {
                database_url,
                port,
                admin_token,
                cache,
                redis_url,
            })
            .await
            .context("server")
        }
        Command::Migrate { database_url } => {
            let pool = server::connect(&database_url).await?;
            server::migrate(&pool).await?;
            tracing::info!("migrations applied to {}", database_url);
            Ok(())
        }
    }
}
