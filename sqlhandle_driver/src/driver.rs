use crate::Connection;
use crate::error::Result;
use async_trait::async_trait;
use mockall::automock;
use std::fmt::{self, Debug};

/// Username and password handed to a driver separately from the connection URL.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new<S: Into<String>>(username: S, password: S) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[automock]
#[async_trait]
pub trait Driver: Debug + Send + Sync {
    /// The URL scheme handled by this driver (e.g. `mysql`)
    fn identifier(&self) -> &'static str;
    async fn connect(&self, url: &str, credentials: &Credentials) -> Result<Box<dyn Connection>>;
}
