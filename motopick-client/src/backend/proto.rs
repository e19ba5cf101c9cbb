//! Messages and client stub for the `plcnext.DataAccessService` service.
//!
//! Written out by hand in the shape `prost-build`/`tonic-build` emit, so the
//! crate builds without `protoc`.

use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::{Body, Bytes, StdError};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRequest {
    #[prost(string, repeated, tag = "1")]
    pub port_names: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResponse {
    #[prost(message, repeated, tag = "1")]
    pub data_items: Vec<DataItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub data_items: Vec<DataItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataItem {
    #[prost(string, tag = "1")]
    pub port_name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<TypedValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypedValue {
    #[prost(
        oneof = "typed_value::Value",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub value: Option<typed_value::Value>,
}

pub mod typed_value {
    /// 8- and 16-bit kinds travel as 32-bit protobuf scalars.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(bool, tag = "1")]
        BoolValue(bool),
        #[prost(int32, tag = "2")]
        Int8Value(i32),
        #[prost(int32, tag = "3")]
        Int16Value(i32),
        #[prost(int32, tag = "4")]
        Int32Value(i32),
        #[prost(int64, tag = "5")]
        Int64Value(i64),
        #[prost(uint32, tag = "6")]
        Uint8Value(u32),
        #[prost(uint32, tag = "7")]
        Uint16Value(u32),
        #[prost(uint32, tag = "8")]
        Uint32Value(u32),
        #[prost(uint64, tag = "9")]
        Uint64Value(u64),
        #[prost(float, tag = "10")]
        FloatValue(f32),
        #[prost(double, tag = "11")]
        DoubleValue(f64),
        #[prost(string, tag = "12")]
        StringValue(String),
    }
}

const READ_PATH: &str = "/plcnext.DataAccessService/Read";
const WRITE_PATH: &str = "/plcnext.DataAccessService/Write";

/// Unary client for the data-access service.
#[derive(Debug, Clone)]
pub struct DataAccessServiceClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> DataAccessServiceClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner: tonic::client::Grpc::new(inner),
        }
    }

    pub async fn read(
        &mut self,
        request: ReadRequest,
    ) -> Result<tonic::Response<ReadResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("Service was not ready: {}", e.into())))?;
        let codec = tonic::codec::ProstCodec::default();
        self.inner
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(READ_PATH),
                codec,
            )
            .await
    }

    pub async fn write(
        &mut self,
        request: WriteRequest,
    ) -> Result<tonic::Response<WriteResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("Service was not ready: {}", e.into())))?;
        let codec = tonic::codec::ProstCodec::default();
        self.inner
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(WRITE_PATH),
                codec,
            )
            .await
    }
}
