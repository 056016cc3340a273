pub mod macros;
pub mod request;
pub mod setup;
