use crate::value::DeclaredType;
use thiserror::Error;

/// Result type alias for port access operations.
pub type VariableResult<T> = Result<T, VariableError>;

/// Centralized error enum for the port access layer.
///
/// None of these ever escape [`RemoteVariableClient`](crate::RemoteVariableClient)'s
/// read/write surface: they are absorbed into the result envelope there.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VariableError {
    /// The channel could not be constructed. Downgrades the client to
    /// simulation for its whole lifetime.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A live request failed in flight.
    ///
    /// `code` is the numeric gRPC status code (see [`friendly_status_hint`]).
    #[error("Transport failure (code {code}): {message}")]
    Transport { code: i32, message: String },

    /// The wire value carried a tag or payload that cannot be represented.
    #[error("Decode anomaly: {0}")]
    Decode(String),

    /// The application value is incompatible with the declared type.
    #[error("Cannot encode {value} as {declared}: {reason}")]
    Encode {
        value: String,
        declared: DeclaredType,
        reason: String,
    },

    /// Catch-all for unexpected internal failures.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VariableError {
    /// Returns the gRPC status code for transport failures.
    pub const fn status_code(&self) -> Option<i32> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(feature = "grpc-backend")]
impl From<tonic::Status> for VariableError {
    fn from(status: tonic::Status) -> Self {
        Self::Transport {
            code: status.code() as i32,
            message: status.message().to_string(),
        }
    }
}

#[cfg(feature = "grpc-backend")]
impl From<tonic::transport::Error> for VariableError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Maps well-known gRPC status codes to actionable operator hints.
pub const fn status_code_hint(code: i32) -> Option<&'static str> {
    match code {
        3 => Some("Controller rejected the value: check the declared type of the port"),
        4 => Some("Controller did not answer in time: check PLC load and network latency"),
        5 => Some("Port name not found in the controller's data-access surface"),
        7 => Some("Access denied: the port may be read-only for this client"),
        12 => Some("Controller firmware does not expose the data-access service"),
        14 => Some("Controller unreachable: check GRPC_ADDRESS and that the gRPC server is running"),
        16 => Some("Controller requires authentication for this channel"),
        _ => None,
    }
}

/// Maps a [`VariableError`] to a friendly hint if it is a transport failure.
///
/// # Examples
/// ```
/// use motopick_client::{VariableError, friendly_status_hint};
///
/// let err = VariableError::Transport { code: 5, message: "no such port".into() };
/// assert_eq!(
///     friendly_status_hint(&err),
///     Some("Port name not found in the controller's data-access surface"),
/// );
///
/// let other = VariableError::Internal("boom".into());
/// assert_eq!(friendly_status_hint(&other), None);
/// ```
pub fn friendly_status_hint(error: &VariableError) -> Option<&'static str> {
    error.status_code().and_then(status_code_hint)
}
