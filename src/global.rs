//! Process-wide registry
//!
//! Optional convenience for applications that want one logger tree reachable
//! from anywhere. Installation is explicit: nothing is created behind the
//! caller's back, and [`shutdown`] uninstalls the registry after closing its
//! handlers so it can be installed again.

use crate::config::LoggingConfig;
use crate::core::{Logger, LoggerError, Registry, Result};
use parking_lot::{const_rwlock, RwLock};
use std::sync::Arc;

static GLOBAL: RwLock<Option<Arc<Registry>>> = const_rwlock(None);

/// Install `registry` as the process-wide registry
///
/// # Errors
///
/// Returns [`LoggerError::AlreadyInitialized`] if a registry is installed
pub fn init(registry: Registry) -> Result<Arc<Registry>> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let registry = Arc::new(registry);
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

/// Build a registry from `config` and install it
///
/// # Errors
///
/// Returns [`LoggerError::AlreadyInitialized`] if a registry is installed,
/// or the configuration error
pub fn init_from_config(config: &LoggingConfig) -> Result<Arc<Registry>> {
    if is_initialized() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let registry = Registry::from_config(config)?;
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        // Lost a race with another initializer
        let _ = registry.shutdown();
        return Err(LoggerError::AlreadyInitialized);
    }
    let registry = Arc::new(registry);
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

pub fn is_initialized() -> bool {
    GLOBAL.read().is_some()
}

/// The installed registry
///
/// # Errors
///
/// Returns [`LoggerError::NotInitialized`] before [`init`]
pub fn registry() -> Result<Arc<Registry>> {
    GLOBAL.read().clone().ok_or(LoggerError::NotInitialized)
}

/// Logger from the installed registry
///
/// # Errors
///
/// Returns [`LoggerError::NotInitialized`] before [`init`]
pub fn get_logger(name: &str) -> Result<Logger> {
    registry().map(|registry| registry.get_logger(name))
}

/// Flush and close every handler, then uninstall the registry
///
/// Logger handles obtained earlier stay usable but no longer write anywhere.
///
/// # Errors
///
/// Returns [`LoggerError::NotInitialized`] if nothing is installed, or the
/// first handler error met while closing
pub fn shutdown() -> Result<()> {
    let registry = GLOBAL.write().take().ok_or(LoggerError::NotInitialized)?;
    registry.shutdown()
}
