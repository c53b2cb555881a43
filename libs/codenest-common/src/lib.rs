pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ClientError;
