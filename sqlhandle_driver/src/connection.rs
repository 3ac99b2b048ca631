use crate::error::Result;
use crate::{ToSql, Value};
use async_trait::async_trait;
use std::fmt::Debug;

/// A single row of a query result
pub type Row = Vec<Value>;

/// Results from a query
///
/// Rows are consumed by advancing the cursor with [`next`](QueryResult::next); a result
/// without rows returns `None` on the first call.
#[async_trait]
pub trait QueryResult: Debug + Send + Sync {
    fn columns(&self) -> &[String];
    async fn next(&mut self) -> Option<&Row>;
}

/// In-memory query result
#[derive(Clone, Debug, Default)]
pub struct MemoryQueryResult {
    columns: Vec<String>,
    row_index: usize,
    rows: Vec<Row>,
}

impl MemoryQueryResult {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            row_index: 0,
            rows,
        }
    }
}

#[async_trait]
impl QueryResult for MemoryQueryResult {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Option<&Row> {
        if self.row_index >= self.rows.len() {
            return None;
        }
        let row = &self.rows[self.row_index];
        self.row_index += 1;
        Some(row)
    }
}

/// Connection to a database
#[async_trait]
pub trait Connection: Debug + Send + Sync {
    fn url(&self) -> &String;
    async fn execute(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<u64>;
    async fn query(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Box<dyn QueryResult>>;

    /// Check that the server is still reachable
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns true once the connection has been closed locally or by the server
    fn is_closed(&self) -> bool;

    async fn close(&mut self) -> Result<()>;
}

type MockExecuteFn = Box<dyn FnMut(&str, &[Value]) -> Result<u64> + Send + Sync>;
type MockQueryFn = Box<dyn FnMut(&str, &[Value]) -> Result<Box<dyn QueryResult>> + Send + Sync>;
type MockPingFn = Box<dyn FnMut() -> Result<()> + Send + Sync>;
type MockIsClosedFn = Box<dyn Fn() -> bool + Send + Sync>;
type MockCloseFn = Box<dyn FnMut() -> Result<()> + Send + Sync>;

/// A mock implementation of [`Connection`] for testing.
///
/// Supports setting expectations via `expect_*` methods with `.returning()` closures.
/// Execute expectations optionally support `.with()` for SQL matching. Without a close
/// expectation, [`close`](Connection::close) succeeds and marks the connection closed.
pub struct MockConnection {
    url: String,
    closed: bool,
    execute_fn: Option<MockExecuteFn>,
    execute_sql: Option<String>,
    query_fn: Option<MockQueryFn>,
    ping_fn: Option<MockPingFn>,
    is_closed_fn: Option<MockIsClosedFn>,
    close_fn: Option<MockCloseFn>,
}

impl Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("url", &self.url)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Builder for setting an execute expectation on [`MockConnection`].
pub struct MockExecuteExpectation<'a> {
    mock: &'a mut MockConnection,
    sql: Option<String>,
}

impl MockExecuteExpectation<'_> {
    /// Restrict this expectation to calls matching the given SQL.
    #[must_use]
    pub fn with(mut self, sql: &str) -> Self {
        self.sql = Some(sql.to_string());
        self
    }

    /// Set the closure to call when the expectation is matched.
    pub fn returning<F>(self, f: F)
    where
        F: FnMut(&str, &[Value]) -> Result<u64> + Send + Sync + 'static,
    {
        self.mock.execute_fn = Some(Box::new(f));
        self.mock.execute_sql = self.sql;
    }
}

/// Builder for setting a query expectation on [`MockConnection`].
pub struct MockQueryExpectation<'a> {
    mock: &'a mut MockConnection,
}

impl MockQueryExpectation<'_> {
    /// Set the closure to call when the expectation is matched.
    pub fn returning<F>(self, f: F)
    where
        F: FnMut(&str, &[Value]) -> Result<Box<dyn QueryResult>> + Send + Sync + 'static,
    {
        self.mock.query_fn = Some(Box::new(f));
    }
}

/// Builder for setting a ping expectation on [`MockConnection`].
pub struct MockPingExpectation<'a> {
    mock: &'a mut MockConnection,
}

impl MockPingExpectation<'_> {
    /// Set the closure to call when the expectation is matched.
    pub fn returning<F>(self, f: F)
    where
        F: FnMut() -> Result<()> + Send + Sync + 'static,
    {
        self.mock.ping_fn = Some(Box::new(f));
    }
}

/// Builder for setting an `is_closed` expectation on [`MockConnection`].
pub struct MockIsClosedExpectation<'a> {
    mock: &'a mut MockConnection,
}

impl MockIsClosedExpectation<'_> {
    /// Set the closure to call when the expectation is matched.
    pub fn returning<F>(self, f: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.mock.is_closed_fn = Some(Box::new(f));
    }
}

/// Builder for setting a close expectation on [`MockConnection`].
pub struct MockCloseExpectation<'a> {
    mock: &'a mut MockConnection,
}

impl MockCloseExpectation<'_> {
    /// Set the closure to call when the expectation is matched.
    pub fn returning<F>(self, f: F)
    where
        F: FnMut() -> Result<()> + Send + Sync + 'static,
    {
        self.mock.close_fn = Some(Box::new(f));
    }
}

impl MockConnection {
    /// Create a new mock with no expectations set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: String::new(),
            closed: false,
            execute_fn: None,
            execute_sql: None,
            query_fn: None,
            ping_fn: None,
            is_closed_fn: None,
            close_fn: None,
        }
    }

    /// Create a new mock reporting the given URL.
    #[must_use]
    pub fn with_url<S: Into<String>>(url: S) -> Self {
        let mut mock = Self::new();
        mock.url = url.into();
        mock
    }

    /// Set an expectation for [`Connection::execute`].
    pub fn expect_execute(&mut self) -> MockExecuteExpectation<'_> {
        MockExecuteExpectation {
            mock: self,
            sql: None,
        }
    }

    /// Set an expectation for [`Connection::query`].
    pub fn expect_query(&mut self) -> MockQueryExpectation<'_> {
        MockQueryExpectation { mock: self }
    }

    /// Set an expectation for [`Connection::ping`].
    pub fn expect_ping(&mut self) -> MockPingExpectation<'_> {
        MockPingExpectation { mock: self }
    }

    /// Set an expectation for [`Connection::is_closed`].
    pub fn expect_is_closed(&mut self) -> MockIsClosedExpectation<'_> {
        MockIsClosedExpectation { mock: self }
    }

    /// Set an expectation for [`Connection::close`].
    pub fn expect_close(&mut self) -> MockCloseExpectation<'_> {
        MockCloseExpectation { mock: self }
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn url(&self) -> &String {
        &self.url
    }

    async fn execute(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<u64> {
        let values: Vec<Value> = params.iter().map(|p| p.to_value()).collect();
        if let Some(expected_sql) = &self.execute_sql {
            assert_eq!(sql, expected_sql, "MockConnection: unexpected SQL");
        }
        let f = self
            .execute_fn
            .as_mut()
            .expect("MockConnection: execute called without expectation");
        f(sql, &values)
    }

    async fn query(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Box<dyn QueryResult>> {
        let values: Vec<Value> = params.iter().map(|p| p.to_value()).collect();
        let f = self
            .query_fn
            .as_mut()
            .expect("MockConnection: query called without expectation");
        f(sql, &values)
    }

    async fn ping(&mut self) -> Result<()> {
        if let Some(f) = self.ping_fn.as_mut() {
            f()
        } else {
            Ok(())
        }
    }

    fn is_closed(&self) -> bool {
        if let Some(f) = self.is_closed_fn.as_ref() {
            f()
        } else {
            self.closed
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(f) = self.close_fn.as_mut() {
            f()?;
        }
        self.closed = true;
        Ok(())
    }
}
