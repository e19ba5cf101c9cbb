use crate::errors::VariableResult;
use crate::value::DataItem;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(any(test, feature = "test-support"))]
use mockall::automock;

/// Literal prefix selecting the local-socket transport.
pub const UNIX_SCHEME: &str = "unix://";

/// Where the data-access service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAddress {
    /// `unix://<path>`: local socket, trusted transport.
    Unix(PathBuf),
    /// `<host>:<port>`: plaintext network transport.
    Network(String),
}

impl ChannelAddress {
    /// Selects the scheme by literal prefix. Never fails; a bad network
    /// address surfaces when the channel is built.
    pub fn parse(address: &str) -> Self {
        match address.strip_prefix(UNIX_SCHEME) {
            Some(path) => Self::Unix(PathBuf::from(path)),
            None => Self::Network(address.to_string()),
        }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
            Self::Network(addr) => f.write_str(addr),
        }
    }
}

/// An open channel to the controller's data-access service.
///
/// One call is one round trip; implementations never retry.
#[cfg_attr(any(test, feature = "test-support"), automock)]
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// `Read(names) -> items`. The reply may omit or reorder names.
    async fn read(&self, port_names: Vec<String>) -> VariableResult<Vec<DataItem>>;

    /// `Write(items) -> ack`.
    async fn write(&self, items: Vec<DataItem>) -> VariableResult<()>;
}

/// Opens data-access channels.
pub trait Connector: Send + Sync {
    /// Build a channel to `address`. Called once per client.
    fn connect(&self, address: &ChannelAddress) -> VariableResult<Arc<dyn DataAccess>>;
}
