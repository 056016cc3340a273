use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable :: {0}")]
    Unavailable(String),

    #[error("cache backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("ttl of {0:?} is out of range")]
    InvalidTtl(Duration),
}
