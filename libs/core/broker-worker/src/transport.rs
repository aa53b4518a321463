//! Transport mode selection and client construction.
//!
//! Exactly one mode is active per worker type at any time; the enum makes
//! that structural. Concrete STOMP/JMS clients live outside this crate and
//! are registered as builders keyed on the mode.

use crate::client::BrokerClient;
use crate::error::WorkerError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which broker protocol a worker type connects with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportMode {
    /// STOMP transport (the default).
    #[default]
    Stomp,
    /// JMS transport.
    Jms,
}

impl TransportMode {
    /// Whether the STOMP transport is active.
    pub fn is_stomp(&self) -> bool {
        matches!(self, TransportMode::Stomp)
    }

    /// Whether the JMS transport is active.
    pub fn is_jms(&self) -> bool {
        matches!(self, TransportMode::Jms)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stomp => write!(f, "stomp"),
            TransportMode::Jms => write!(f, "jms"),
        }
    }
}

/// Builds an unconnected client for one transport mode.
pub type ClientBuilder = Arc<dyn Fn() -> Arc<dyn BrokerClient> + Send + Sync>;

/// Registry of client builders keyed on transport mode.
///
/// Construct one at process start, register a builder per mode the process
/// supports, and hand the factory to `WorkerDefinition::run`.
#[derive(Clone, Default)]
pub struct TransportFactory {
    builders: HashMap<TransportMode, ClientBuilder>,
}

impl TransportFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the client builder for a transport mode.
    pub fn register<F>(&mut self, mode: TransportMode, builder: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn BrokerClient> + Send + Sync + 'static,
    {
        self.builders.insert(mode, Arc::new(builder));
        self
    }

    /// Whether a builder is registered for a mode.
    pub fn supports(&self, mode: TransportMode) -> bool {
        self.builders.contains_key(&mode)
    }

    /// Build an unconnected client for a mode.
    pub fn create(&self, mode: TransportMode) -> Result<Arc<dyn BrokerClient>, WorkerError> {
        self.builders
            .get(&mode)
            .map(|builder| builder())
            .ok_or(WorkerError::UnsupportedTransport(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBrokerClient;

    #[test]
    fn test_default_is_stomp() {
        let mode = TransportMode::default();
        assert!(mode.is_stomp());
        assert!(!mode.is_jms());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransportMode::Stomp.to_string(), "stomp");
        assert_eq!(TransportMode::Jms.to_string(), "jms");
    }

    #[test]
    fn test_create_without_builder_fails() {
        let factory = TransportFactory::new();
        let err = factory.create(TransportMode::Jms).err().unwrap();
        assert!(matches!(
            err,
            WorkerError::UnsupportedTransport(TransportMode::Jms)
        ));
    }

    #[test]
    fn test_registered_builder_is_used() {
        let mut factory = TransportFactory::new();
        factory.register(TransportMode::Stomp, || {
            let mut mock = MockBrokerClient::new();
            mock.expect_is_closed().return_const(false);
            Arc::new(mock) as Arc<dyn BrokerClient>
        });

        assert!(factory.supports(TransportMode::Stomp));
        assert!(!factory.supports(TransportMode::Jms));

        let client = factory.create(TransportMode::Stomp).unwrap();
        assert!(!client.is_closed());
    }
}
