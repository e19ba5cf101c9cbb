use crate::backend::connector::{ChannelAddress, Connector, DataAccess};
use crate::provider::{ClientMode, ReadResult, VariableProvider};
use crate::store::VariableStore;
use crate::value::{DataItem, DeclaredType, VariableValue, decode_value, encode_value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The connector compiled into this build, if any.
///
/// Resolved once at start-up and handed to [`RemoteVariableClient::with_connector`].
pub fn default_connector() -> Option<Arc<dyn Connector>> {
    #[cfg(feature = "grpc-backend")]
    {
        Some(Arc::new(crate::backend::grpc::GrpcConnector))
    }
    #[cfg(not(feature = "grpc-backend"))]
    {
        None
    }
}

enum Backend {
    Live(Arc<dyn DataAccess>),
    Simulated,
}

/// Dual-mode [`VariableProvider`].
///
/// Tries to open a channel once, at construction. Any failure leaves the
/// client in [`ClientMode::Simulated`] for its whole lifetime; there is no
/// reconnection. Either way callers get the same result envelope.
///
/// The client holds no locks. Share it behind a
/// [`SharedProvider`](crate::SharedProvider) when several tasks use it.
pub struct RemoteVariableClient {
    address: String,
    backend: Backend,
    store: VariableStore,
}

impl RemoteVariableClient {
    /// Creates a client using the connector compiled into this build.
    ///
    /// Must run inside a Tokio runtime for the live channel to come up;
    /// otherwise the client falls back to simulation.
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_connector(address, default_connector())
    }

    /// Creates a client with an explicit connector capability.
    ///
    /// `None` means no transport is available and the client simulates.
    /// Never fails.
    pub fn with_connector(
        address: impl Into<String>,
        connector: Option<Arc<dyn Connector>>,
    ) -> Self {
        let address = address.into();
        let store = VariableStore::initialize();

        let backend = match connector {
            None => {
                tracing::info!(address = %address, "Running in simulation mode (no transport)");
                Backend::Simulated
            }
            Some(connector) => match connector.connect(&ChannelAddress::parse(&address)) {
                Ok(channel) => {
                    tracing::info!(address = %address, "Data access channel connected");
                    Backend::Live(channel)
                }
                Err(e) => {
                    tracing::error!(
                        address = %address,
                        error = %e,
                        "Connection failed, switching to simulation mode"
                    );
                    Backend::Simulated
                }
            },
        };

        Self {
            address,
            backend,
            store,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Copy of the simulated port space. Mutating it does not affect the client.
    pub fn simulation_snapshot(&self) -> BTreeMap<String, VariableValue> {
        self.store.snapshot()
    }

    /// Sets a simulated port directly, bypassing the mode check.
    pub fn seed_simulated(&mut self, name: impl Into<String>, value: VariableValue) {
        self.store.set(name, value);
    }
}

impl std::fmt::Debug for RemoteVariableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteVariableClient")
            .field("address", &self.address)
            .field("mode", &self.mode())
            .field("ports", &self.store.len())
            .finish()
    }
}

#[async_trait]
impl VariableProvider for RemoteVariableClient {
    async fn read_single(&self, name: &str) -> ReadResult {
        let channel = match &self.backend {
            Backend::Simulated => return ReadResult::simulated(name, self.store.get(name)),
            Backend::Live(channel) => channel,
        };

        match channel.read(vec![name.to_string()]).await {
            Ok(items) => match items.first() {
                Some(item) => ReadResult::live(name, decode_value(item.value.as_ref())),
                None => {
                    tracing::warn!(port = %name, "Read returned no items");
                    ReadResult::missing(name)
                }
            },
            Err(e) => {
                tracing::error!(port = %name, error = %e, "Read error");
                ReadResult::failed(name, e.to_string())
            }
        }
    }

    async fn read_multiple(&self, names: &[String]) -> Vec<ReadResult> {
        let channel = match &self.backend {
            Backend::Simulated => {
                return names
                    .iter()
                    .map(|name| ReadResult::simulated(name.as_str(), self.store.get(name)))
                    .collect();
            }
            Backend::Live(channel) => channel,
        };

        if names.is_empty() {
            return Vec::new();
        }

        match channel.read(names.to_vec()).await {
            // Keyed by the name the controller reports; omitted ports drop out.
            Ok(items) => {
                if items.len() != names.len() {
                    tracing::warn!(
                        requested = names.len(),
                        returned = items.len(),
                        "Read multiple returned a different item count"
                    );
                }
                items
                    .into_iter()
                    .map(|item| {
                        let value = decode_value(item.value.as_ref());
                        ReadResult::live(item.port_name, value)
                    })
                    .collect()
            }
            Err(e) => {
                tracing::error!(count = names.len(), error = %e, "Read multiple error");
                let message = e.to_string();
                names
                    .iter()
                    .map(|name| ReadResult::failed(name.as_str(), message.clone()))
                    .collect()
            }
        }
    }

    async fn write_single(
        &mut self,
        name: &str,
        value: VariableValue,
        declared: DeclaredType,
    ) -> bool {
        let channel = match &self.backend {
            Backend::Simulated => {
                tracing::debug!(port = %name, value = %value, "[SIM] Write");
                self.store.set(name, value);
                return true;
            }
            Backend::Live(channel) => channel,
        };

        let wire = match encode_value(&value, declared) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::error!(port = %name, value = %value, error = %e, "Write error");
                return false;
            }
        };

        match channel.write(vec![DataItem::new(name, wire)]).await {
            Ok(()) => {
                tracing::debug!(port = %name, value = %value, declared = %declared, "Write completed");
                true
            }
            Err(e) => {
                tracing::error!(port = %name, value = %value, error = %e, "Write error");
                false
            }
        }
    }

    fn mode(&self) -> ClientMode {
        match self.backend {
            Backend::Live(_) => ClientMode::Live,
            Backend::Simulated => ClientMode::Simulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::connector::MockDataAccess;
    use crate::errors::{VariableError, VariableResult};
    use crate::value::WireValue;

    struct FailingConnector;

    impl Connector for FailingConnector {
        fn connect(&self, _address: &ChannelAddress) -> VariableResult<Arc<dyn DataAccess>> {
            Err(VariableError::Connection("host unreachable".into()))
        }
    }

    struct StaticConnector(Arc<dyn DataAccess>);

    impl Connector for StaticConnector {
        fn connect(&self, _address: &ChannelAddress) -> VariableResult<Arc<dyn DataAccess>> {
            Ok(Arc::clone(&self.0))
        }
    }

    fn live_client(mock: MockDataAccess) -> RemoteVariableClient {
        let connector: Arc<dyn Connector> = Arc::new(StaticConnector(Arc::new(mock)));
        RemoteVariableClient::with_connector("192.168.1.10:50051", Some(connector))
    }

    fn simulated_client() -> RemoteVariableClient {
        RemoteVariableClient::with_connector("unix:///run/plcnext/grpc.sock", None)
    }

    fn unavailable() -> VariableError {
        VariableError::Transport {
            code: 14,
            message: "connection refused".into(),
        }
    }

    #[tokio::test]
    async fn test_unreachable_controller_falls_back_to_simulation() {
        let connector: Arc<dyn Connector> = Arc::new(FailingConnector);
        let mut client = RemoteVariableClient::with_connector("10.0.0.99:50051", Some(connector));
        assert_eq!(client.mode(), ClientMode::Simulated);
        assert!(!client.is_connected());

        assert!(
            client
                .write_single("X.Y", VariableValue::I64(42), DeclaredType::Auto)
                .await
        );
        let result = client.read_single("X.Y").await;
        assert_eq!(result.value, Some(VariableValue::I64(42)));
        assert!(result.succeeded);
        assert!(result.simulated);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_no_transport_is_simulated() {
        let client = simulated_client();
        assert_eq!(client.mode(), ClientMode::Simulated);
        assert_eq!(client.address(), "unix:///run/plcnext/grpc.sock");
    }

    #[tokio::test]
    async fn test_simulated_missing_port_still_succeeds() {
        let client = simulated_client();
        let result = client.read_single("Arp.Plc.Eclr/MotoPick.Robot09.Running").await;
        assert!(result.succeeded);
        assert!(result.simulated);
        assert_eq!(result.value, None);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_simulated_write_read_round_trip_all_kinds() {
        let mut client = simulated_client();
        let values = [
            VariableValue::Bool(true),
            VariableValue::I8(-8),
            VariableValue::I16(-16),
            VariableValue::I32(-32),
            VariableValue::I64(-64),
            VariableValue::U8(8),
            VariableValue::U16(16),
            VariableValue::U32(32),
            VariableValue::U64(64),
            VariableValue::F32(1.25),
            VariableValue::F64(1.000_000_5),
            VariableValue::String("Format A".into()),
        ];

        for (i, value) in values.into_iter().enumerate() {
            let name = format!("Test.Port{i}");
            // No type enforcement in simulation, even against a declared type.
            assert!(
                client
                    .write_single(&name, value.clone(), DeclaredType::Int16)
                    .await
            );
            let result = client.read_single(&name).await;
            assert_eq!(result.value, Some(value));
        }
    }

    #[tokio::test]
    async fn test_simulated_read_multiple_keeps_request_order() {
        let client = simulated_client();
        let names = vec![
            "Arp.Plc.Eclr/MotoPick.Robot02.Enabled".to_string(),
            "Nope".to_string(),
            "Arp.Plc.Eclr/MotoPick.Robot03.Enabled".to_string(),
        ];
        let results = client.read_multiple(&names).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, names[0]);
        assert_eq!(results[0].value, Some(VariableValue::Bool(true)));
        assert_eq!(results[1].value, None);
        assert!(results[1].succeeded);
        assert_eq!(results[2].value, Some(VariableValue::Bool(false)));
        assert!(results.iter().all(|r| r.simulated));
    }

    #[tokio::test]
    async fn test_read_multiple_empty_in_both_modes() {
        let client = simulated_client();
        assert!(client.read_multiple(&[]).await.is_empty());

        let mut mock = MockDataAccess::new();
        mock.expect_read().times(0);
        let client = live_client(mock);
        assert!(client.read_multiple(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_live_read_single_decodes_first_item() {
        let mut mock = MockDataAccess::new();
        mock.expect_read()
            .withf(|names| names == &["Arp.Plc.Eclr/MotoPick.System.PicksPerMinute".to_string()])
            .times(1)
            .returning(|names| {
                Ok(vec![DataItem::new(
                    names[0].clone(),
                    WireValue::Double(61.123_456_789),
                )])
            });

        let client = live_client(mock);
        assert_eq!(client.mode(), ClientMode::Live);

        let result = client
            .read_single("Arp.Plc.Eclr/MotoPick.System.PicksPerMinute")
            .await;
        assert_eq!(result.value, Some(VariableValue::F64(61.123_457)));
        assert!(result.succeeded);
        assert!(!result.simulated);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_live_read_single_empty_reply_fails() {
        let mut mock = MockDataAccess::new();
        mock.expect_read().returning(|_| Ok(Vec::new()));

        let client = live_client(mock);
        let result = client.read_single("X.Y").await;
        assert_eq!(result, ReadResult::missing("X.Y"));
    }

    #[tokio::test]
    async fn test_live_read_single_untagged_value_is_absent_success() {
        let mut mock = MockDataAccess::new();
        mock.expect_read().returning(|names| {
            Ok(vec![DataItem {
                port_name: names[0].clone(),
                value: None,
            }])
        });

        let client = live_client(mock);
        let result = client.read_single("X.Y").await;
        assert!(result.succeeded);
        assert_eq!(result.value, None);
    }

    #[tokio::test]
    async fn test_live_read_single_transport_error() {
        let mut mock = MockDataAccess::new();
        mock.expect_read().returning(|_| Err(unavailable()));

        let client = live_client(mock);
        let result = client.read_single("X.Y").await;
        assert!(!result.succeeded);
        assert!(!result.simulated);
        assert_eq!(result.value, None);
        assert_eq!(
            result.error.as_deref(),
            Some("Transport failure (code 14): connection refused")
        );
    }

    #[tokio::test]
    async fn test_live_read_multiple_rekeys_by_reported_name() {
        let mut mock = MockDataAccess::new();
        mock.expect_read().times(1).returning(|_| {
            // The controller silently drops the second port.
            Ok(vec![
                DataItem::new("A.Running", WireValue::Bool(true)),
                DataItem::new("C.Speed", WireValue::Float(0.5)),
            ])
        });

        let client = live_client(mock);
        let names = vec![
            "A.Running".to_string(),
            "B.Running".to_string(),
            "C.Speed".to_string(),
        ];
        let results = client.read_multiple(&names).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], ReadResult::live("A.Running", Some(VariableValue::Bool(true))));
        assert_eq!(results[1], ReadResult::live("C.Speed", Some(VariableValue::F64(0.5))));
    }

    #[tokio::test]
    async fn test_live_read_multiple_transport_error_fails_every_name() {
        let mut mock = MockDataAccess::new();
        mock.expect_read().returning(|_| Err(unavailable()));

        let client = live_client(mock);
        let names = vec!["A".to_string(), "B".to_string()];
        let results = client.read_multiple(&names).await;

        assert_eq!(results.len(), 2);
        for (result, name) in results.iter().zip(&names) {
            assert_eq!(&result.name, name);
            assert!(!result.succeeded);
            assert_eq!(
                result.error.as_deref(),
                Some("Transport failure (code 14): connection refused")
            );
        }
    }

    #[tokio::test]
    async fn test_live_write_sends_encoded_item() {
        let mut mock = MockDataAccess::new();
        mock.expect_write()
            .withf(|items| {
                items == &[DataItem::new(
                    "Arp.Plc.Eclr/MotoPick.Conveyor01.Speed",
                    WireValue::Float(0.75),
                )]
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut client = live_client(mock);
        assert!(
            client
                .write_single(
                    "Arp.Plc.Eclr/MotoPick.Conveyor01.Speed",
                    VariableValue::F64(0.75),
                    DeclaredType::parse("real"),
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_live_write_auto_bool_stays_bool() {
        let mut mock = MockDataAccess::new();
        mock.expect_write()
            .withf(|items| items[0].value == Some(WireValue::Bool(true)))
            .times(1)
            .returning(|_| Ok(()));

        let mut client = live_client(mock);
        assert!(
            client
                .write_single("A.Enabled", VariableValue::Bool(true), DeclaredType::Auto)
                .await
        );
    }

    #[tokio::test]
    async fn test_live_write_encode_failure_returns_false() {
        let mut mock = MockDataAccess::new();
        mock.expect_write().times(0);

        let mut client = live_client(mock);
        assert!(
            !client
                .write_single("X.Y", "abc".into(), DeclaredType::parse("DINT"))
                .await
        );
    }

    #[tokio::test]
    async fn test_live_write_transport_error_returns_false() {
        let mut mock = MockDataAccess::new();
        mock.expect_write().returning(|_| Err(unavailable()));

        let mut client = live_client(mock);
        assert!(
            !client
                .write_single("X.Y", VariableValue::I32(1), DeclaredType::Auto)
                .await
        );
    }

    #[tokio::test]
    async fn test_live_write_does_not_touch_simulation() {
        let mut mock = MockDataAccess::new();
        mock.expect_write().returning(|_| Ok(()));

        let mut client = live_client(mock);
        assert!(
            client
                .write_single("X.Y", VariableValue::I32(1), DeclaredType::Auto)
                .await
        );
        assert!(!client.simulation_snapshot().contains_key("X.Y"));
    }

    #[tokio::test]
    async fn test_snapshot_and_seed() {
        let mut client = simulated_client();
        client.seed_simulated(
            "Arp.Plc.Eclr/MotoPick.System.Running",
            VariableValue::Bool(true),
        );

        let mut snapshot = client.simulation_snapshot();
        assert_eq!(snapshot.len(), 183);
        assert_eq!(
            snapshot.get("Arp.Plc.Eclr/MotoPick.System.Running"),
            Some(&VariableValue::Bool(true))
        );

        snapshot.clear();
        assert_eq!(client.simulation_snapshot().len(), 183);
    }
}
