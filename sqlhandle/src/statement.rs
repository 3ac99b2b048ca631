use sqlhandle_driver::Error::ParameterCount;
use sqlhandle_driver::{Result, ToSql, Value, placeholder_count};

/// A SQL statement with `?` positional placeholders and the values bound to them.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedStatement {
    sql: String,
    placeholders: usize,
    parameters: Vec<Value>,
}

impl PreparedStatement {
    #[must_use]
    pub fn new<S: Into<String>>(sql: S) -> Self {
        let sql = sql.into();
        let placeholders = placeholder_count(&sql);
        Self {
            sql,
            placeholders,
            parameters: Vec::new(),
        }
    }

    /// Bind the value for the next placeholder.
    #[must_use]
    pub fn bind<T: ToSql>(mut self, value: T) -> Self {
        self.parameters.push(value.to_value());
        self
    }

    /// Bind the value for the next placeholder in place.
    pub fn push<T: ToSql>(&mut self, value: T) {
        self.parameters.push(value.to_value());
    }

    /// Remove all bound values so the statement can be reused.
    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    #[must_use]
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Check that exactly one value is bound per placeholder.
    ///
    /// # Errors
    /// * [`ParameterCount`](sqlhandle_driver::Error::ParameterCount) if the counts differ
    pub fn validate(&self) -> Result<()> {
        if self.placeholders == self.parameters.len() {
            Ok(())
        } else {
            Err(ParameterCount {
                expected: self.placeholders,
                actual: self.parameters.len(),
            })
        }
    }

    pub(crate) fn params(&self) -> Vec<&dyn ToSql> {
        self.parameters
            .iter()
            .map(|value| value as &dyn ToSql)
            .collect()
    }
}
