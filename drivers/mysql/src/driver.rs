use crate::results::{column_names, convert_rows};
use async_trait::async_trait;
use sqlhandle_driver::Error::{CloseFailed, ConnectionFailed, InvalidUrl, NotConnected, Query};
use sqlhandle_driver::{Credentials, Error, MemoryQueryResult, QueryResult, Result, ToSql, Value};
use sqlx::Connection as SqlxConnection;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Executor, MySql, Row as _};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Connection URL parameter that carries the auto-reconnect flag. It is consumed by the
/// connection handle and never forwarded to the server.
pub const AUTO_RECONNECT_PARAMETER: &str = "autoReconnect";

#[derive(Debug)]
pub struct Driver;

#[async_trait]
impl sqlhandle_driver::Driver for Driver {
    fn identifier(&self) -> &'static str {
        "mysql"
    }

    async fn connect(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn sqlhandle_driver::Connection>> {
        let connection = Connection::new(url, credentials).await?;
        Ok(Box::new(connection))
    }
}

/// Strip the parameters sqlx does not understand from the connection URL.
fn driver_url(url: &str) -> Result<Url> {
    let mut parsed_url = Url::parse(url)?;
    let pairs: Vec<(String, String)> = parsed_url
        .query_pairs()
        .filter(|(key, _)| key != AUTO_RECONNECT_PARAMETER)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if pairs.is_empty() {
        parsed_url.set_query(None);
    } else {
        parsed_url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    Ok(parsed_url)
}

/// A single MySQL connection; there is no pool behind it.
///
/// The socket lives behind a [`Mutex`] only so the type is `Sync`; statement methods take
/// `&mut self` and reach it through [`Mutex::get_mut`] without locking.
pub struct Connection {
    url: String,
    connection: Mutex<Option<MySqlConnection>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("closed", &sqlhandle_driver::Connection::is_closed(self))
            .finish()
    }
}

impl Connection {
    pub(crate) async fn new(url: &str, credentials: &Credentials) -> Result<Connection> {
        let driver_url = driver_url(url)?;
        let mut options = MySqlConnectOptions::from_str(driver_url.as_str())
            .map_err(|error| InvalidUrl(error.to_string()))?;
        if !credentials.username().is_empty() {
            options = options.username(credentials.username());
        }
        if !credentials.password().is_empty() {
            options = options.password(credentials.password());
        }

        let connection = options
            .connect()
            .await
            .map_err(|error| ConnectionFailed(error.to_string()))?;
        debug!("opened mysql connection to {driver_url}");

        Ok(Connection {
            url: url.to_string(),
            connection: Mutex::new(Some(connection)),
        })
    }

    fn slot(&mut self) -> &mut Option<MySqlConnection> {
        match self.connection.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connection(&mut self) -> Result<&mut MySqlConnection> {
        self.slot().as_mut().ok_or(NotConnected)
    }

    /// Column names of a statement that returned no rows. The rows carry no column
    /// metadata then, so the statement is described instead; failing that, no names are
    /// reported.
    async fn describe_columns(&mut self, sql: &str) -> Vec<String> {
        let Ok(connection) = self.connection() else {
            return Vec::new();
        };
        match connection.describe(sql).await {
            Ok(describe) => column_names(describe.columns()),
            Err(error) => {
                debug!("unable to describe columns: {error}");
                Vec::new()
            }
        }
    }

    /// Map a statement failure; transport failures leave the socket unusable, so the
    /// connection is dropped and reported as closed from then on.
    fn statement_error(&mut self, error: sqlx::Error) -> Error {
        if matches!(error, sqlx::Error::Io(_) | sqlx::Error::Protocol(_)) {
            warn!("mysql connection lost: {error}");
            *self.slot() = None;
        }
        Query(error.to_string())
    }
}

#[async_trait]
impl sqlhandle_driver::Connection for Connection {
    fn url(&self) -> &String {
        &self.url
    }

    async fn execute(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<u64> {
        let values = sqlhandle_driver::to_values(params);
        let mut query = sqlx::query(sql);
        for value in &values {
            query = bind_mysql_value(query, value);
        }
        let result = query.execute(self.connection()?).await;
        match result {
            Ok(result) => Ok(result.rows_affected()),
            Err(error) => Err(self.statement_error(error)),
        }
    }

    async fn query(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Box<dyn QueryResult>> {
        let values = sqlhandle_driver::to_values(params);
        let mut query = sqlx::query(sql);
        for value in &values {
            query = bind_mysql_value(query, value);
        }
        let result = query.fetch_all(self.connection()?).await;
        let query_rows = match result {
            Ok(query_rows) => query_rows,
            Err(error) => return Err(self.statement_error(error)),
        };

        let columns = match query_rows.first() {
            Some(row) => column_names(row.columns()),
            None => self.describe_columns(sql).await,
        };
        let rows = convert_rows(&query_rows)?;
        Ok(Box::new(MemoryQueryResult::new(columns, rows)))
    }

    async fn ping(&mut self) -> Result<()> {
        let result = self.connection()?.ping().await;
        result.map_err(|error| self.statement_error(error))
    }

    fn is_closed(&self) -> bool {
        !self
            .connection
            .lock()
            .is_ok_and(|connection| connection.is_some())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.slot().take() {
            connection
                .close()
                .await
                .map_err(|error| CloseFailed(error.to_string()))?;
        }
        Ok(())
    }
}

fn bind_mysql_value<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::I8(v) => query.bind(i16::from(*v)),
        Value::I16(v) => query.bind(*v),
        Value::I32(v) => query.bind(*v),
        Value::I64(v) => query.bind(*v),
        Value::U8(v) => query.bind(i16::from(*v)),
        Value::U16(v) => query.bind(i32::from(*v)),
        Value::U32(v) => query.bind(i64::from(*v)),
        Value::U64(v) => query.bind(*v),
        Value::F32(v) => query.bind(*v),
        Value::F64(v) => query.bind(*v),
        Value::Decimal(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Date(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
        Value::DateTime(v) => query.bind(*v),
        Value::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}
