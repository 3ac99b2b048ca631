//! # sqlhandle driver
//!
//! The driver library provides the interfaces a database backend implements so that a
//! [`Connection`] can be opened, used to execute SQL and closed again.

#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod connection;
mod driver;
mod driver_manager;
mod error;
mod placeholder;
mod to_sql;
mod value;

pub use connection::{Connection, MemoryQueryResult, MockConnection, QueryResult, Row};
pub use driver::{Credentials, Driver, MockDriver};
pub use driver_manager::DriverManager;
pub use error::{Error, Result};
pub use placeholder::placeholder_count;
pub use to_sql::{ToSql, to_values};
pub use value::Value;
