mod backend;
mod error;
mod key;
mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::{CacheKey, FilterParams, KeyKind, Resource};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
