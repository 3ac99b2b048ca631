use sqlhandle_driver::Credentials;
use std::fmt;
use std::time::Duration;
use url::form_urlencoded;

/// URL scheme of the default driver
pub const DEFAULT_SCHEME: &str = "mysql";
/// Default MySQL server port
pub const DEFAULT_PORT: u16 = 3306;
/// Auto-reconnect is enabled unless configured otherwise
pub const DEFAULT_AUTO_RECONNECT: bool = true;
/// Delay between disconnecting and connecting again in
/// [`reconnect`](crate::ConnectionHandle::reconnect)
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Connection parameters; immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    scheme: String,
    host: String,
    port: u16,
    username: String,
    password: String,
    database: String,
    auto_reconnect: bool,
    reconnect_delay: Duration,
}

impl ConnectionConfig {
    /// Create a configuration using the default port and auto-reconnect enabled.
    #[must_use]
    pub fn new<S: Into<String>>(host: S, username: S, password: S, database: S) -> Self {
        Self::builder()
            .with_host(host)
            .with_username(username)
            .with_password(password)
            .with_database(database)
            .build()
    }

    /// Create a builder to set every parameter explicitly.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn is_auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// The connection URL handed to the driver (e.g.
    /// `mysql://localhost:3306/mydb?autoReconnect=true`). Credentials are never part of it.
    ///
    /// IPv6 hosts are bracketed and the database name is percent-encoded.
    #[must_use]
    pub fn url(&self) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        // form encoding writes spaces as `+`; a literal `+` is already `%2B`
        let database = form_urlencoded::byte_serialize(self.database.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        format!(
            "{}://{host}:{}/{database}?autoReconnect={}",
            self.scheme, self.port, self.auto_reconnect
        )
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            auto_reconnect: DEFAULT_AUTO_RECONNECT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("database", &self.database)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

/// A builder for creating a [`ConnectionConfig`] instance.
#[derive(Clone, Debug, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the URL scheme used to select the driver.
    #[must_use]
    pub fn with_scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Set the server host name or address.
    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the user to authenticate as.
    #[must_use]
    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the password to authenticate with.
    #[must_use]
    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the database to use.
    #[must_use]
    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.config.database = database.into();
        self
    }

    /// Set whether a lost connection is re-opened before the next statement.
    #[must_use]
    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.config.auto_reconnect = auto_reconnect;
        self
    }

    /// Set the pause between disconnecting and connecting in a reconnect.
    #[must_use]
    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.config.reconnect_delay = reconnect_delay;
        self
    }

    /// Build a [`ConnectionConfig`] instance.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
