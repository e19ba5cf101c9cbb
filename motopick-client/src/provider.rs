use crate::value::{DeclaredType, VariableValue};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[cfg(any(test, feature = "test-support"))]
use mockall::automock;

/// Which side serves reads and writes. Fixed when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Requests go to the controller over the data-access channel.
    Live,
    /// Requests are served from the in-memory port space.
    Simulated,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Simulated => f.write_str("simulated"),
        }
    }
}

/// A single port's read result.
///
/// Same shape in both modes; only `simulated` tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    /// The port name (for batched live reads, as reported by the controller).
    pub name: String,
    /// The decoded value, `None` when absent.
    pub value: Option<VariableValue>,
    /// Whether the read was served.
    pub succeeded: bool,
    /// Whether the in-memory port space served the read.
    pub simulated: bool,
    /// Transport error text for failed live reads.
    pub error: Option<String>,
}

impl ReadResult {
    /// A simulated lookup. Always succeeds, even for unknown ports.
    pub fn simulated(name: impl Into<String>, value: Option<VariableValue>) -> Self {
        Self {
            name: name.into(),
            value,
            succeeded: true,
            simulated: true,
            error: None,
        }
    }

    /// A value decoded from a live reply.
    pub fn live(name: impl Into<String>, value: Option<VariableValue>) -> Self {
        Self {
            name: name.into(),
            value,
            succeeded: true,
            simulated: false,
            error: None,
        }
    }

    /// A live reply that carried no item for the port.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            succeeded: false,
            simulated: false,
            error: None,
        }
    }

    /// A live request that failed in flight.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            succeeded: false,
            simulated: false,
            error: Some(error.into()),
        }
    }
}

/// A provider shared between tasks behind the one mutual-exclusion guard.
pub type SharedProvider = Arc<tokio::sync::Mutex<dyn VariableProvider>>;

/// Async trait for typed port access.
///
/// This is the whole contract the rest of the system depends on. None of
/// the operations fail: transport and encoding problems are folded into
/// the returned envelope.
#[cfg_attr(any(test, feature = "test-support"), automock)]
#[async_trait]
pub trait VariableProvider: Send + Sync {
    /// Read one port.
    async fn read_single(&self, name: &str) -> ReadResult;

    /// Read several ports in one request.
    ///
    /// In live mode the results follow the controller's reply, which may
    /// omit ports; the count is not guaranteed to match `names`.
    async fn read_multiple(&self, names: &[String]) -> Vec<ReadResult>;

    /// Write one port, encoding the value according to `declared`.
    ///
    /// Returns `false` when the value cannot be encoded or the request fails.
    async fn write_single(
        &mut self,
        name: &str,
        value: VariableValue,
        declared: DeclaredType,
    ) -> bool;

    /// The mode chosen at construction.
    fn mode(&self) -> ClientMode;

    /// `true` when a live channel serves requests.
    fn is_connected(&self) -> bool {
        self.mode() == ClientMode::Live
    }
}
