//! # sqlhandle
//!
//! A handle around a single database connection. The handle keeps the connection
//! parameters, opens at most one connection through a driver, runs updates and queries on
//! it, and closes it when the caller is done.
//!
//! ```no_run
//! use sqlhandle::{ConnectionConfig, ConnectionHandle, PreparedStatement};
//!
//! # async fn example() -> sqlhandle::Result<()> {
//! let config = ConnectionConfig::new("localhost", "user", "pass", "mydb");
//! let mut handle = ConnectionHandle::new(config)?;
//!
//! handle
//!     .with_connection(async |handle: &mut ConnectionHandle| {
//!         handle
//!             .execute_update("CREATE TABLE IF NOT EXISTS person (id INT, name VARCHAR(20))")
//!             .await?;
//!         let statement = PreparedStatement::new("SELECT name FROM person WHERE id = ?").bind(1);
//!         let mut result = handle.execute_prepared(&statement).await?;
//!         while let Some(row) = result.next().await {
//!             println!("{row:?}");
//!         }
//!         Ok(())
//!     })
//!     .await
//! # }
//! ```

#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod config;
mod drivers;
mod handle;
pub mod settings;
mod statement;

pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, DEFAULT_AUTO_RECONNECT, DEFAULT_PORT,
    DEFAULT_RECONNECT_DELAY, DEFAULT_SCHEME,
};
pub use drivers::register_drivers;
pub use handle::{ConnectOutcome, ConnectionHandle, DisconnectOutcome};
pub use sqlhandle_driver::{
    Connection, Credentials, Driver, DriverManager, Error, MemoryQueryResult, QueryResult,
    Result, Row, ToSql, Value,
};
pub use statement::PreparedStatement;
