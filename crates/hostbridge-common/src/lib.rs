pub mod errors;
pub mod id;

pub use errors::{BridgeError, ConfigError, RemoteError};
pub use id::{CallToken, TokenAllocator, CALLBACK_PREFIX};

pub type Result<T> = std::result::Result<T, BridgeError>;
