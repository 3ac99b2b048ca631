use crate::config::ConnectionConfig;
use crate::drivers;
use crate::statement::PreparedStatement;
use sqlhandle_driver::Error::{DriverNotFound, NotConnected};
use sqlhandle_driver::{Connection, Driver, DriverManager, QueryResult, Result};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`ConnectionHandle::connect`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection was opened
    Connected,
    /// A connection was already present and was left untouched
    AlreadyConnected,
}

/// Outcome of [`ConnectionHandle::disconnect`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The open connection was closed
    Closed,
    /// The connection had already been closed; it was discarded
    AlreadyClosed,
    /// No connection was ever established
    NotConnected,
}

/// Owns the configuration for one database and at most one open connection to it.
///
/// Every operation completes before it returns. Lifecycle failures (connect, close) and
/// statement failures are both logged and returned to the caller; a failed statement
/// leaves the connection in place.
///
/// The connection is released when the handle is dropped. Use
/// [`with_connection`](Self::with_connection) to scope a connection to a block of work with
/// a graceful close at the end.
#[derive(Debug)]
pub struct ConnectionHandle {
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    connection: Option<Box<dyn Connection>>,
}

impl ConnectionHandle {
    /// Create a disconnected handle using the driver registered for the configured scheme.
    ///
    /// # Errors
    /// * [`DriverNotFound`](sqlhandle_driver::Error::DriverNotFound) if no driver handles
    ///   the scheme
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        drivers::register_drivers()?;
        let Some(driver) = DriverManager::get(config.scheme())? else {
            error!("no driver registered for scheme {}", config.scheme());
            return Err(DriverNotFound(config.scheme().to_string()));
        };
        Ok(Self::with_driver(config, driver))
    }

    /// Create a disconnected handle using the given driver.
    #[must_use]
    pub fn with_driver(config: ConnectionConfig, driver: Arc<dyn Driver>) -> Self {
        Self {
            config,
            driver,
            connection: None,
        }
    }

    /// Open a connection unless one is already present.
    ///
    /// # Errors
    /// * If the driver cannot establish the connection
    #[instrument(level = "info", skip(self), fields(host = %self.config.host(), port = self.config.port(), database = %self.config.database()))]
    pub async fn connect(&mut self) -> Result<ConnectOutcome> {
        if self.connection.is_some() {
            info!("already connected");
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        let url = self.config.url();
        debug!("connecting to {url}");
        match self.driver.connect(&url, &self.config.credentials()).await {
            Ok(connection) => {
                self.connection = Some(connection);
                info!("connection established");
                Ok(ConnectOutcome::Connected)
            }
            Err(error) => {
                error!("failed to connect: {error}");
                Err(error)
            }
        }
    }

    /// Close the connection if one is open.
    ///
    /// A connection that already reports closed is not closed again, but it is still
    /// discarded so that a later [`connect`](Self::connect) opens a new connection instead
    /// of returning [`ConnectOutcome::AlreadyConnected`] for a dead one.
    /// If closing fails the connection is discarded as well, since it cannot be trusted
    /// afterwards, and the error is returned.
    ///
    /// # Errors
    /// * If the driver fails to close the connection
    #[instrument(level = "info", skip(self))]
    pub async fn disconnect(&mut self) -> Result<DisconnectOutcome> {
        let Some(mut connection) = self.connection.take() else {
            info!("no connection was established; nothing to close");
            return Ok(DisconnectOutcome::NotConnected);
        };

        if connection.is_closed() {
            info!("connection is already closed");
            return Ok(DisconnectOutcome::AlreadyClosed);
        }

        info!("closing connection");
        match connection.close().await {
            Ok(()) => {
                info!("connection closed");
                Ok(DisconnectOutcome::Closed)
            }
            Err(error) => {
                error!("failed to close connection: {error}");
                Err(error)
            }
        }
    }

    /// Disconnect, wait for the configured reconnect delay, then connect again.
    ///
    /// # Errors
    /// * If either the disconnect or the connect fails
    pub async fn reconnect(&mut self) -> Result<ConnectOutcome> {
        self.disconnect().await?;
        let delay = self.config.reconnect_delay();
        debug!("waiting {delay:?} before reconnecting");
        sleep(delay).await;
        self.connect().await
    }

    /// Run a statement that does not return rows (DDL or DML) and return the number of
    /// affected rows.
    ///
    /// # Errors
    /// * [`NotConnected`](sqlhandle_driver::Error::NotConnected) without an open connection
    /// * If the statement fails
    pub async fn execute_update(&mut self, sql: &str) -> Result<u64> {
        debug!("execute update: {sql}");
        let result = match self.live_connection().await {
            Ok(connection) => connection.execute(sql, &[]).await,
            Err(error) => Err(error),
        };
        result.inspect_err(|error| error!("update failed: {error}"))
    }

    /// Run a query and return its result set. A query that matches nothing returns an
    /// empty result set, not an error.
    ///
    /// # Errors
    /// * [`NotConnected`](sqlhandle_driver::Error::NotConnected) without an open connection
    /// * If the query fails
    pub async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn QueryResult>> {
        debug!("execute query: {sql}");
        let result = match self.live_connection().await {
            Ok(connection) => connection.query(sql, &[]).await,
            Err(error) => Err(error),
        };
        result.inspect_err(|error| error!("query failed: {error}"))
    }

    /// Run a prepared query with its bound parameters.
    ///
    /// # Errors
    /// * [`ParameterCount`](sqlhandle_driver::Error::ParameterCount) if the bound values do
    ///   not match the placeholders; nothing is sent to the server
    /// * [`NotConnected`](sqlhandle_driver::Error::NotConnected) without an open connection
    /// * If the query fails
    pub async fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
    ) -> Result<Box<dyn QueryResult>> {
        debug!(
            "execute prepared query: {} ({} parameter(s))",
            statement.sql(),
            statement.parameters().len()
        );
        let result = match statement.validate() {
            Ok(()) => match self.live_connection().await {
                Ok(connection) => connection.query(statement.sql(), &statement.params()).await,
                Err(error) => Err(error),
            },
            Err(error) => Err(error),
        };
        result.inspect_err(|error| error!("prepared query failed: {error}"))
    }

    /// Run a prepared statement that does not return rows and return the number of
    /// affected rows.
    ///
    /// # Errors
    /// * [`ParameterCount`](sqlhandle_driver::Error::ParameterCount) if the bound values do
    ///   not match the placeholders; nothing is sent to the server
    /// * [`NotConnected`](sqlhandle_driver::Error::NotConnected) without an open connection
    /// * If the statement fails
    pub async fn execute_prepared_update(&mut self, statement: &PreparedStatement) -> Result<u64> {
        debug!(
            "execute prepared update: {} ({} parameter(s))",
            statement.sql(),
            statement.parameters().len()
        );
        let result = match statement.validate() {
            Ok(()) => match self.live_connection().await {
                Ok(connection) => connection.execute(statement.sql(), &statement.params()).await,
                Err(error) => Err(error),
            },
            Err(error) => Err(error),
        };
        result.inspect_err(|error| error!("prepared update failed: {error}"))
    }

    /// Create a prepared statement for this handle's connection.
    ///
    /// # Errors
    /// * [`NotConnected`](sqlhandle_driver::Error::NotConnected) without an open connection
    pub fn prepare<S: Into<String>>(&self, sql: S) -> Result<PreparedStatement> {
        if self.connection.is_none() {
            error!("cannot prepare a statement without a connection");
            return Err(NotConnected);
        }
        Ok(PreparedStatement::new(sql))
    }

    /// Connect, run `f`, then disconnect whether or not `f` succeeded.
    ///
    /// Only a connection opened by this call is closed afterwards; a connection the handle
    /// already had is left open for the caller. The result of `f` is returned; a failure
    /// to disconnect is only reported when `f` itself succeeded.
    ///
    /// # Errors
    /// * If connecting fails, `f` fails, or disconnecting fails
    pub async fn with_connection<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut ConnectionHandle) -> Result<T>,
    {
        let outcome = self.connect().await?;
        let result = f(&mut *self).await;
        if outcome == ConnectOutcome::AlreadyConnected {
            return result;
        }
        let disconnected = self.disconnect().await;
        match (result, disconnected) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(error)) | (Err(error), _) => Err(error),
        }
    }

    /// The connection to run a statement on. With auto-reconnect enabled, a connection
    /// that has been lost is re-opened first.
    async fn live_connection(&mut self) -> Result<&mut Box<dyn Connection>> {
        let lost = self
            .connection
            .as_ref()
            .is_some_and(|connection| connection.is_closed());

        if lost {
            if !self.config.is_auto_reconnect() {
                error!("connection is closed and auto-reconnect is disabled");
                return Err(NotConnected);
            }
            warn!("connection lost; reconnecting");
            self.connection = None;
            self.connect().await?;
        }

        self.connection.as_mut().ok_or(NotConnected)
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &str {
        self.config.host()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.config.port()
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.config.username()
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.config.password()
    }

    #[must_use]
    pub fn database(&self) -> &str {
        self.config.database()
    }

    #[must_use]
    pub fn is_auto_reconnect(&self) -> bool {
        self.config.is_auto_reconnect()
    }

    /// The current connection, if any
    #[must_use]
    pub fn connection(&self) -> Option<&dyn Connection> {
        self.connection.as_deref()
    }

    /// True if a connection is present and does not report closed
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        if connection.is_closed() {
            return;
        }

        warn!(
            "connection to {} dropped without disconnect",
            self.config.host()
        );
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(error) = connection.close().await {
                    error!("failed to close dropped connection: {error}");
                }
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sqlhandle_driver::{Error, MemoryQueryResult, MockConnection, MockDriver, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use test_log::test;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("localhost", "user", "pass", "mydb")
    }

    fn counting_driver(connects: Arc<AtomicUsize>) -> Arc<dyn Driver> {
        let mut driver = MockDriver::new();
        driver.expect_identifier().returning(|| "mysql");
        driver.expect_connect().returning(move |url, credentials| {
            assert_eq!(url, "mysql://localhost:3306/mydb?autoReconnect=true");
            assert_eq!(credentials.username(), "user");
            assert_eq!(credentials.password(), "pass");
            let count = connects.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Box::new(MockConnection::with_url(format!("mock://{count}"))))
        });
        Arc::new(driver)
    }

    fn connection_driver<F>(factory: F) -> Arc<dyn Driver>
    where
        F: Fn() -> MockConnection + Send + Sync + 'static,
    {
        let mut driver = MockDriver::new();
        driver.expect_identifier().returning(|| "mysql");
        driver
            .expect_connect()
            .returning(move |_, _| Ok(Box::new(factory())));
        Arc::new(driver)
    }

    #[test]
    fn test_accessors() {
        let handle = ConnectionHandle::with_driver(config(), counting_driver(Arc::default()));

        assert_eq!(handle.host(), "localhost");
        assert_eq!(handle.port(), 3306);
        assert_eq!(handle.username(), "user");
        assert_eq!(handle.password(), "pass");
        assert_eq!(handle.database(), "mydb");
        assert!(handle.is_auto_reconnect());
        assert_eq!(handle.config(), &config());
        assert!(handle.connection().is_none());
        assert!(!handle.is_connected());
    }

    #[test]
    fn test_new_driver_not_found() {
        let config = ConnectionConfig::builder().with_scheme("unknown").build();
        let result = ConnectionHandle::new(config);
        assert!(matches!(result, Err(DriverNotFound(scheme)) if scheme == "unknown"));
    }

    #[test(tokio::test)]
    async fn test_connect_twice() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(connects.clone()));

        assert_eq!(handle.connect().await?, ConnectOutcome::Connected);
        assert_eq!(handle.connect().await?, ConnectOutcome::AlreadyConnected);

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        let url = handle.connection().map(|connection| connection.url().clone());
        assert_eq!(url.as_deref(), Some("mock://1"));
        assert!(handle.is_connected());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_connect_error() {
        let mut driver = MockDriver::new();
        driver
            .expect_connect()
            .returning(|_, _| Err(Error::ConnectionFailed("refused".to_string())));
        let mut handle = ConnectionHandle::with_driver(config(), Arc::new(driver));

        let result = handle.connect().await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
        assert!(handle.connection().is_none());
    }

    #[test(tokio::test)]
    async fn test_disconnect_without_connection() -> Result<()> {
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(Arc::default()));
        assert_eq!(handle.disconnect().await?, DisconnectOutcome::NotConnected);
        assert_eq!(handle.disconnect().await?, DisconnectOutcome::NotConnected);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_disconnect_already_closed() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection.expect_is_closed().returning(|| true);
            connection
                .expect_close()
                .returning(|| panic!("close called on a closed connection"));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        assert_eq!(handle.disconnect().await?, DisconnectOutcome::AlreadyClosed);
        assert!(handle.connection().is_none());
        assert_eq!(handle.connect().await?, ConnectOutcome::Connected);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_connect_disconnect_connect() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(connects.clone()));

        handle.connect().await?;
        assert_eq!(handle.disconnect().await?, DisconnectOutcome::Closed);
        assert!(handle.connection().is_none());

        assert_eq!(handle.connect().await?, ConnectOutcome::Connected);
        let url = handle.connection().map(|connection| connection.url().clone());
        assert_eq!(url.as_deref(), Some("mock://2"));
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_disconnect_error() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_close()
                .returning(|| Err(Error::CloseFailed("reset".to_string())));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let result = handle.disconnect().await;
        assert!(matches!(result, Err(Error::CloseFailed(_))));
        assert!(handle.connection().is_none());
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_reconnect() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(connects.clone()));
        handle.connect().await?;

        let start = tokio::time::Instant::now();
        assert_eq!(handle.reconnect().await?, ConnectOutcome::Connected);
        assert!(start.elapsed() >= Duration::from_secs(1));

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        let url = handle.connection().map(|connection| connection.url().clone());
        assert_eq!(url.as_deref(), Some("mock://2"));
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_reconnect_without_connection() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(connects.clone()));

        assert_eq!(handle.reconnect().await?, ConnectOutcome::Connected);
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_update() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_execute()
                .with("CREATE TABLE person (id INT)")
                .returning(|_, params| {
                    assert!(params.is_empty());
                    Ok(0)
                });
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let rows = handle.execute_update("CREATE TABLE person (id INT)").await?;
        assert_eq!(rows, 0);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_update_error_keeps_connection() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_execute()
                .returning(|_, _| Err(Error::Query("syntax error".to_string())));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let result = handle.execute_update("CREATE TABEL person").await;
        assert!(matches!(result, Err(Error::Query(_))));
        assert!(handle.is_connected());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_without_connection() {
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(Arc::default()));

        let result = handle.execute_update("DELETE FROM person").await;
        assert!(matches!(result, Err(NotConnected)));
        let result = handle.execute_query("SELECT 1").await;
        assert!(matches!(result, Err(NotConnected)));
    }

    #[test(tokio::test)]
    async fn test_execute_query() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection.expect_query().returning(|sql, _| {
                let rows = if sql.contains("WHERE id = 42") {
                    vec![]
                } else {
                    vec![vec![Value::I32(1)]]
                };
                Ok(Box::new(MemoryQueryResult::new(vec!["id".to_string()], rows)))
            });
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let mut result = handle.execute_query("SELECT id FROM person").await?;
        assert_eq!(result.columns(), ["id"]);
        assert_eq!(result.next().await.cloned(), Some(vec![Value::I32(1)]));
        assert!(result.next().await.is_none());

        let mut result = handle
            .execute_query("SELECT id FROM person WHERE id = 42")
            .await?;
        assert!(result.next().await.is_none());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_query_error() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_query()
                .returning(|_, _| Err(Error::Query("no such table".to_string())));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let result = handle.execute_query("SELECT * FROM missing").await;
        assert!(matches!(result, Err(Error::Query(_))));
        assert!(handle.is_connected());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_prepared() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection.expect_query().returning(|sql, params| {
                assert_eq!(sql, "SELECT name FROM person WHERE id = ?");
                assert_eq!(params, [Value::I64(7)]);
                Ok(Box::new(MemoryQueryResult::new(
                    vec!["name".to_string()],
                    vec![vec![Value::String("foo".to_string())]],
                )))
            });
            connection.expect_execute().returning(|sql, params| {
                assert_eq!(sql, "DELETE FROM person WHERE id = ?");
                assert_eq!(params, [Value::I64(7)]);
                Ok(1)
            });
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let statement = handle
            .prepare("SELECT name FROM person WHERE id = ?")?
            .bind(7i64);
        let mut result = handle.execute_prepared(&statement).await?;
        assert_eq!(
            result.next().await.cloned(),
            Some(vec![Value::String("foo".to_string())])
        );

        let statement = handle.prepare("DELETE FROM person WHERE id = ?")?.bind(7i64);
        assert_eq!(handle.execute_prepared_update(&statement).await?, 1);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_execute_prepared_parameter_mismatch() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_query()
                .returning(|_, _| panic!("statement must not reach the driver"));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        let statement = handle.prepare("SELECT * FROM person WHERE id = ? AND name = ?")?;
        let statement = statement.bind(1i32);
        let result = handle.execute_prepared(&statement).await;
        assert!(matches!(
            result,
            Err(Error::ParameterCount {
                expected: 2,
                actual: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn test_prepare_without_connection() {
        let handle = ConnectionHandle::with_driver(config(), counting_driver(Arc::default()));
        let result = handle.prepare("SELECT 1");
        assert!(matches!(result, Err(NotConnected)));
    }

    #[test(tokio::test)]
    async fn test_auto_reconnect_after_connection_lost() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let connects_in_driver = connects.clone();
        let driver = connection_driver(move || {
            let first = connects_in_driver.fetch_add(1, Ordering::SeqCst) == 0;
            let mut connection = MockConnection::new();
            connection.expect_is_closed().returning(move || first);
            connection.expect_execute().returning(|_, _| Ok(1));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;
        assert!(!handle.is_connected());

        assert_eq!(handle.execute_update("DELETE FROM person").await?, 1);
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert!(handle.is_connected());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_connection_lost_without_auto_reconnect() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection.expect_is_closed().returning(|| true);
            connection
        });
        let config = ConnectionConfig::builder()
            .with_database("mydb")
            .with_auto_reconnect(false)
            .build();
        let mut handle = ConnectionHandle::with_driver(config, driver);
        handle.connect().await?;

        let result = handle.execute_query("SELECT 1").await;
        assert!(matches!(result, Err(NotConnected)));
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_with_connection() -> Result<()> {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection.expect_execute().returning(|_, _| Ok(3));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);

        let rows = handle
            .with_connection(async |handle: &mut ConnectionHandle| {
                assert!(handle.is_connected());
                handle.execute_update("UPDATE person SET name = 'foo'").await
            })
            .await?;

        assert_eq!(rows, 3);
        assert!(handle.connection().is_none());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_with_connection_keeps_existing_connection() -> Result<()> {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut handle = ConnectionHandle::with_driver(config(), counting_driver(connects.clone()));
        handle.connect().await?;

        let url = handle
            .with_connection(async |handle: &mut ConnectionHandle| {
                Ok(handle.connection().map(|connection| connection.url().clone()))
            })
            .await?;

        assert_eq!(url.as_deref(), Some("mock://1"));
        assert!(handle.is_connected());
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(handle.disconnect().await?, DisconnectOutcome::Closed);
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_with_connection_disconnects_on_error() {
        let driver = connection_driver(|| {
            let mut connection = MockConnection::new();
            connection
                .expect_execute()
                .returning(|_, _| Err(Error::Query("deadlock".to_string())));
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);

        let result = handle
            .with_connection(async |handle: &mut ConnectionHandle| {
                handle.execute_update("UPDATE person SET name = 'foo'").await
            })
            .await;

        assert!(matches!(result, Err(Error::Query(_))));
        assert!(handle.connection().is_none());
    }

    #[test(tokio::test)]
    async fn test_drop_connected_handle() -> Result<()> {
        let closed = Arc::new(AtomicUsize::new(0));
        let closed_in_driver = closed.clone();
        let driver = connection_driver(move || {
            let closed = closed_in_driver.clone();
            let mut connection = MockConnection::new();
            connection.expect_close().returning(move || {
                closed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            connection
        });
        let mut handle = ConnectionHandle::with_driver(config(), driver);
        handle.connect().await?;

        drop(handle);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
