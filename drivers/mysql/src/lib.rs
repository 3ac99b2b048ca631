#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod driver;
mod results;

pub use driver::{AUTO_RECONNECT_PARAMETER, Connection, Driver};
