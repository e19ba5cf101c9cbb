//! Transport backends for the data-access channel.
//!
//! The connector seam is always compiled; concrete transports are gated
//! behind feature flags.

pub mod connector;

#[cfg(feature = "grpc-backend")]
pub mod grpc;

#[cfg(feature = "grpc-backend")]
pub mod proto;
