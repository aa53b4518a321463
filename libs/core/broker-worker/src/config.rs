//! Lazily-evaluated per-worker-type configuration.

use crate::error::WorkerError;
use std::sync::Arc;

/// Opaque configuration handed to the broker client at connect time.
pub type Configuration = serde_json::Map<String, serde_json::Value>;

/// Zero-argument supplier producing a fresh `Configuration` on every call.
pub type ConfigSupplier = Arc<dyn Fn() -> Configuration + Send + Sync>;

/// Holds the configuration supplier for one worker type.
///
/// The supplier is re-run on every access (nothing is memoized), so
/// workers observe live changes in whatever state the closure captures.
/// Callers relying on picking up configuration changes at runtime depend
/// on this.
#[derive(Clone, Default)]
pub struct ConfigurationSlot {
    supplier: Option<ConfigSupplier>,
}

impl ConfigurationSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { supplier: None }
    }

    /// Register the supplier invoked on every configuration access.
    pub fn configure<F>(&mut self, supplier: F)
    where
        F: Fn() -> Configuration + Send + Sync + 'static,
    {
        self.supplier = Some(Arc::new(supplier));
    }

    /// Whether a supplier has been registered.
    pub fn is_configured(&self) -> bool {
        self.supplier.is_some()
    }

    /// The registered supplier. Invoking the returned closure runs the
    /// supplier and yields its result.
    pub fn supplier(&self) -> Result<ConfigSupplier, WorkerError> {
        self.supplier
            .clone()
            .ok_or_else(|| WorkerError::configuration("no configuration supplier registered"))
    }

    /// Resolve the configuration now (runs the supplier once).
    pub fn resolve(&self) -> Result<Configuration, WorkerError> {
        Ok(self.supplier()?())
    }

    /// Drop the registered supplier.
    pub fn clear(&mut self) {
        self.supplier = None;
    }
}
