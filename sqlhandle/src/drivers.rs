use sqlhandle_driver::Result;

/// Register the drivers enabled by crate features with the
/// [`DriverManager`](sqlhandle_driver::DriverManager). Registering again replaces the
/// previous instance.
///
/// # Errors
/// * If the driver registry lock cannot be acquired
pub fn register_drivers() -> Result<()> {
    #[cfg(feature = "mysql")]
    sqlhandle_driver::DriverManager::add(std::sync::Arc::new(sqlhandle_driver_mysql::Driver))?;

    Ok(())
}
