//! # motopick-client
//!
//! Typed access to the MotoPick cell's PLC ports, with a transparent
//! in-memory simulation when no controller is reachable.
//!
//! ## Features
//! - `grpc-backend` (default): Talks to the controller's data-access service over `tonic`
//! - `test-support`: Enables `MockVariableProvider` and `MockDataAccess` via `mockall`

mod backend;
mod client;
mod errors;
mod live;
mod provider;
mod store;
mod value;

// Stable public API
pub use backend::connector::{ChannelAddress, Connector, DataAccess, UNIX_SCHEME};
pub use client::{RemoteVariableClient, default_connector};
pub use errors::{VariableError, VariableResult, friendly_status_hint, status_code_hint};
pub use live::{
    CONVEYOR_VIEW_FIELDS, LiveView, ROBOT_VIEW_FIELDS, SYSTEM_VIEW_FIELDS, UnitFields,
    group_by_unit, read_conveyors, read_robots, read_system, split_port_name,
};
pub use provider::{ClientMode, ReadResult, SharedProvider, VariableProvider};
pub use store::{
    CONVEYOR_FIELDS, DEFAULT_ENABLED_UNITS, MAX_CONVEYORS, MAX_ROBOTS, PORT_PREFIX, ROBOT_FIELDS,
    SYSTEM_FIELDS, VariableStore, conveyor_port, robot_port, system_port, unit_port,
};
pub use value::{
    DECODED_FLOAT_DECIMALS, DataItem, DeclaredType, VariableValue, WireValue, decode_value,
    encode_value, round_decoded_float,
};

// Backend re-exports (conditional)
#[cfg(feature = "grpc-backend")]
pub use backend::grpc::{GrpcConnector, GrpcDataAccess};

// Test support re-export
#[cfg(feature = "test-support")]
pub use backend::connector::MockDataAccess;
#[cfg(feature = "test-support")]
pub use provider::MockVariableProvider;
