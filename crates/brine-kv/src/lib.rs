//! Brine - a key-value store on top of SQL databases
//!
//! One table (`brine`, two text columns `key` and `value`) in SQLite,
//! PostgreSQL or MySQL/MariaDB, selected by the connection URI.
//!
//! # Usage
//!
//! ```no_run
//! use brine_kv::{Brine, KvResult};
//!
//! # async fn demo() -> KvResult<()> {
//! let store: Brine<serde_json::Value> = Brine::new("sqlite::memory:");
//! store.init().await?;
//!
//! store.set("key", serde_json::json!({ "any": "value" })).await?;
//! store.get("key").await?;            // Some({"any": "value"})
//! store.has("key").await?;            // true
//! store.delete("key").await?;
//! store.keys().await?;                // []
//! store.clear().await?;
//! store.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Connection URIs:
//!
//! - `sqlite::memory:`
//! - `sqlite:<path>?mode=rwc`
//! - `postgres://<user>:<password>@<host>:<port>/<database>`
//! - `mysql://<user>:<password>@<host>:<port>/<database>`

mod brine;
mod codec;
mod config;
mod dialect;
mod engine;
mod error;
mod manager;
mod migrator;

pub use brine::Brine;
pub use codec::{Codec, FnCodec, JsonCodec, RawCodec};
pub use config::{BrineConfig, PoolConfig, SqliteConfig};
pub use dialect::{Dialect, KEY_COLUMN, TABLE_NAME, VALUE_COLUMN};
pub use engine::KvEngine;
pub use error::{KvError, KvResult};
pub use manager::{Connection, ConnectionManager, LifecycleState};
pub use migrator::migrate;

pub use brine_sql::{Backend, ConnectionUri, IsolationLevel, ServerOptions};
