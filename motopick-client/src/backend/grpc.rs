use crate::backend::connector::{ChannelAddress, Connector, DataAccess};
use crate::backend::proto::{self, DataAccessServiceClient, typed_value::Value};
use crate::errors::{VariableError, VariableResult};
use crate::value::{DataItem, WireValue};
use async_trait::async_trait;
use std::sync::Arc;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

/// [`Connector`] that opens lazily-connecting tonic channels.
///
/// Building the channel does not touch the network; the first request does.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcConnector;

impl Connector for GrpcConnector {
    fn connect(&self, address: &ChannelAddress) -> VariableResult<Arc<dyn DataAccess>> {
        // Lazy channels spawn their buffer task on the ambient runtime.
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(VariableError::Connection(
                "no Tokio runtime available to drive the channel".into(),
            ));
        }

        let channel = match address {
            ChannelAddress::Network(addr) => network_channel(addr)?,
            ChannelAddress::Unix(path) => unix_channel(path)?,
        };
        tracing::debug!(address = %address, "gRPC channel constructed");
        Ok(Arc::new(GrpcDataAccess {
            client: DataAccessServiceClient::new(channel),
        }))
    }
}

fn network_channel(addr: &str) -> VariableResult<Channel> {
    let endpoint = Endpoint::from_shared(format!("http://{addr}"))
        .map_err(|e| VariableError::Connection(format!("invalid address '{addr}': {e}")))?;
    Ok(endpoint.connect_lazy())
}

#[cfg(unix)]
fn unix_channel(path: &std::path::Path) -> VariableResult<Channel> {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tonic::codegen::http::Uri;

    // Authority for local-socket channels; never resolved.
    const UNIX_PLACEHOLDER_URI: &str = "http://[::]:50051";

    if !path.exists() {
        return Err(VariableError::Connection(format!(
            "socket {} does not exist",
            path.display()
        )));
    }

    let socket = path.to_path_buf();
    let endpoint = Endpoint::from_static(UNIX_PLACEHOLDER_URI);
    Ok(
        endpoint.connect_with_connector_lazy(tower::service_fn(move |_: Uri| {
            let socket = socket.clone();
            async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(socket).await?)) }
        })),
    )
}

#[cfg(not(unix))]
fn unix_channel(path: &std::path::Path) -> VariableResult<Channel> {
    Err(VariableError::Connection(format!(
        "local sockets are not supported on this platform ({})",
        path.display()
    )))
}

/// [`DataAccess`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcDataAccess {
    client: DataAccessServiceClient<Channel>,
}

#[async_trait]
impl DataAccess for GrpcDataAccess {
    async fn read(&self, port_names: Vec<String>) -> VariableResult<Vec<DataItem>> {
        let span = tracing::debug_span!("gds.read", count = port_names.len());
        let mut client = self.client.clone();
        let response = client
            .read(proto::ReadRequest { port_names })
            .instrument(span)
            .await?
            .into_inner();
        Ok(response.data_items.into_iter().map(from_proto_item).collect())
    }

    async fn write(&self, items: Vec<DataItem>) -> VariableResult<()> {
        let span = tracing::debug_span!("gds.write", count = items.len());
        let mut client = self.client.clone();
        let data_items = items.into_iter().map(to_proto_item).collect();
        client
            .write(proto::WriteRequest { data_items })
            .instrument(span)
            .await?;
        Ok(())
    }
}

/// Converts a reply item. Anomalous payloads become an absent value.
fn from_proto_item(item: proto::DataItem) -> DataItem {
    let value = item
        .value
        .and_then(|typed| typed.value)
        .and_then(|value| match wire_from_proto(value) {
            Ok(wire) => Some(wire),
            Err(e) => {
                tracing::warn!(port = %item.port_name, error = %e, "Value extraction error");
                None
            }
        });
    DataItem {
        port_name: item.port_name,
        value,
    }
}

fn to_proto_item(item: DataItem) -> proto::DataItem {
    proto::DataItem {
        port_name: item.port_name,
        value: item.value.map(|wire| proto::TypedValue {
            value: Some(wire_to_proto(wire)),
        }),
    }
}

/// Narrows the 32-bit carriers back to the declared width.
pub fn wire_from_proto(value: Value) -> VariableResult<WireValue> {
    fn narrow<S: Copy + std::fmt::Display, T: TryFrom<S>>(v: S, tag: &str) -> VariableResult<T> {
        T::try_from(v).map_err(|_| VariableError::Decode(format!("{tag} {v} out of range")))
    }

    Ok(match value {
        Value::BoolValue(v) => WireValue::Bool(v),
        Value::Int8Value(v) => WireValue::Int8(narrow(v, "int8Value")?),
        Value::Int16Value(v) => WireValue::Int16(narrow(v, "int16Value")?),
        Value::Int32Value(v) => WireValue::Int32(v),
        Value::Int64Value(v) => WireValue::Int64(v),
        Value::Uint8Value(v) => WireValue::UInt8(narrow(v, "uint8Value")?),
        Value::Uint16Value(v) => WireValue::UInt16(narrow(v, "uint16Value")?),
        Value::Uint32Value(v) => WireValue::UInt32(v),
        Value::Uint64Value(v) => WireValue::UInt64(v),
        Value::FloatValue(v) => WireValue::Float(v),
        Value::DoubleValue(v) => WireValue::Double(v),
        Value::StringValue(v) => WireValue::String(v),
    })
}

pub fn wire_to_proto(wire: WireValue) -> Value {
    match wire {
        WireValue::Bool(v) => Value::BoolValue(v),
        WireValue::Int8(v) => Value::Int8Value(i32::from(v)),
        WireValue::Int16(v) => Value::Int16Value(i32::from(v)),
        WireValue::Int32(v) => Value::Int32Value(v),
        WireValue::Int64(v) => Value::Int64Value(v),
        WireValue::UInt8(v) => Value::Uint8Value(u32::from(v)),
        WireValue::UInt16(v) => Value::Uint16Value(u32::from(v)),
        WireValue::UInt32(v) => Value::Uint32Value(v),
        WireValue::UInt64(v) => Value::Uint64Value(v),
        WireValue::Float(v) => Value::FloatValue(v),
        WireValue::Double(v) => Value::DoubleValue(v),
        WireValue::String(v) => Value::StringValue(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_narrow_int8_out_of_range_is_decode_anomaly() {
        let err = wire_from_proto(Value::Int8Value(300)).unwrap_err();
        assert!(matches!(err, VariableError::Decode(_)));
        assert_eq!(
            wire_from_proto(Value::Int8Value(-128)).unwrap(),
            WireValue::Int8(-128)
        );
        assert!(wire_from_proto(Value::Uint16Value(70_000)).is_err());
    }

    #[test]
    fn test_reply_item_without_tag_is_absent() {
        let item = from_proto_item(proto::DataItem {
            port_name: "Arp.Plc.Eclr/MotoPick.System.Running".into(),
            value: Some(proto::TypedValue { value: None }),
        });
        assert_eq!(item.port_name, "Arp.Plc.Eclr/MotoPick.System.Running");
        assert_eq!(item.value, None);

        let item = from_proto_item(proto::DataItem {
            port_name: "X.Y".into(),
            value: None,
        });
        assert_eq!(item.value, None);
    }

    #[test]
    fn test_reply_item_with_anomaly_is_absent() {
        let item = from_proto_item(proto::DataItem {
            port_name: "X.Y".into(),
            value: Some(proto::TypedValue {
                value: Some(Value::Uint8Value(256)),
            }),
        });
        assert_eq!(item.value, None);
    }

    #[test]
    fn test_write_item_survives_the_wire() {
        let request = proto::WriteRequest {
            data_items: vec![to_proto_item(DataItem::new(
                "Arp.Plc.Eclr/MotoPick.Robot01.Enabled",
                WireValue::Int16(-7),
            ))],
        };
        let bytes = request.encode_to_vec();
        let decoded = proto::WriteRequest::decode(bytes.as_slice()).unwrap();
        let item = decoded.data_items.into_iter().next().unwrap();
        assert_eq!(item.port_name, "Arp.Plc.Eclr/MotoPick.Robot01.Enabled");
        let value = item.value.and_then(|t| t.value).unwrap();
        assert_eq!(wire_from_proto(value).unwrap(), WireValue::Int16(-7));
    }

    #[test]
    fn test_connect_outside_runtime_fails() {
        let result = GrpcConnector.connect(&ChannelAddress::parse("127.0.0.1:50051"));
        assert!(matches!(result, Err(VariableError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_missing_socket_fails() {
        let result = GrpcConnector.connect(&ChannelAddress::parse(
            "unix:///nonexistent/motopick/grpc.sock",
        ));
        assert!(matches!(result, Err(VariableError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_invalid_network_address_fails() {
        let result = GrpcConnector.connect(&ChannelAddress::parse("not a host:port"));
        assert!(matches!(result, Err(VariableError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_network_is_lazy() {
        // Nothing listens here; construction must still succeed.
        let result = GrpcConnector.connect(&ChannelAddress::parse("127.0.0.1:9"));
        assert!(result.is_ok());
    }
}
