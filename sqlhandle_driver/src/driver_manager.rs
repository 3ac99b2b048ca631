use crate::Error::{DriverNotFound, InvalidUrl, IoError};
use crate::error::Result;
use crate::{Connection, Credentials, Driver};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::instrument;
use url::Url;

type DriverMap = BTreeMap<&'static str, Arc<dyn Driver>>;

static DRIVERS: LazyLock<RwLock<DriverMap>> = LazyLock::new(RwLock::default);

fn poisoned<T>(error: &PoisonError<T>) -> crate::Error {
    IoError(format!("driver registry lock poisoned: {error}"))
}

/// Process-wide registry of drivers, keyed by URL scheme
#[derive(Debug)]
pub struct DriverManager;

impl DriverManager {
    /// Register a driver under its identifier, replacing any driver with the same one.
    ///
    /// # Errors
    /// * If the registry lock is poisoned
    pub fn add(driver: Arc<dyn Driver>) -> Result<()> {
        let mut drivers = DRIVERS.write().map_err(|error| poisoned(&error))?;
        drivers.insert(driver.identifier(), driver);
        Ok(())
    }

    /// The driver registered for a scheme, if any.
    ///
    /// # Errors
    /// * If the registry lock is poisoned
    pub fn get<S: AsRef<str>>(scheme: S) -> Result<Option<Arc<dyn Driver>>> {
        let drivers = DRIVERS.read().map_err(|error| poisoned(&error))?;
        Ok(drivers.get(scheme.as_ref()).cloned())
    }

    /// All registered drivers, ordered by identifier.
    ///
    /// # Errors
    /// * If the registry lock is poisoned
    pub fn drivers() -> Result<Vec<Arc<dyn Driver>>> {
        let drivers = DRIVERS.read().map_err(|error| poisoned(&error))?;
        Ok(drivers.values().cloned().collect())
    }

    /// Connect to a database using the driver registered for the URL scheme
    ///
    /// # Errors
    /// * If the URL cannot be parsed
    /// * If no driver is registered for the URL scheme
    /// * If the driver fails to connect
    #[instrument(name = "connect", level = "info", skip(url, credentials))]
    pub async fn connect<S: AsRef<str>>(
        url: S,
        credentials: &Credentials,
    ) -> Result<Box<dyn Connection>> {
        let url = url.as_ref();
        let parsed = Url::parse(url).map_err(|error| InvalidUrl(error.to_string()))?;
        let driver = Self::get(parsed.scheme())?
            .ok_or_else(|| DriverNotFound(parsed.scheme().to_string()))?;
        driver.connect(url, credentials).await
    }
}
