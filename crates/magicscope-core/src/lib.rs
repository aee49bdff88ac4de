//! Safe libmagic bindings: an owned detector handle, typed flags and
//! params, a pool for concurrent use, and TOML-backed defaults.

pub mod config;
pub mod database;
pub mod error;
pub mod flags;
pub mod magic;
pub mod param;
pub mod pool;

pub use config::{LogConfig, MagicConfig, ParamsConfig};
pub use database::DatabaseList;
pub use error::{EngineError, MagicError, Result};
pub use flags::Flags;
pub use magic::Magic;
pub use param::Param;
pub use pool::{MagicPool, PooledMagic};
