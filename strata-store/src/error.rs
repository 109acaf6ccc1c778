//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a storage tier can report.
///
/// `Clone` so that one coalesced remote fetch can hand the same failure to
/// every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The device has no network connection.
    #[error("not connected to the network")]
    NotConnected,

    /// The connection dropped mid-request.
    #[error("network connection lost")]
    ConnectionLost,

    /// The remote answered with no payload.
    #[error("empty response")]
    EmptyResponse,

    /// Other transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The remote rejected the request.
    #[error("remote API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A payload could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The tier does not implement this operation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Underlying persistence engine failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A fallback tier failed after another tier had already failed.
    #[error("{current} (after: {previous})")]
    Composite {
        current: Box<StoreError>,
        previous: Box<StoreError>,
    },
}

impl StoreError {
    /// Wraps a fallback failure together with the failure it followed.
    pub fn composite(current: StoreError, previous: StoreError) -> Self {
        Self::Composite {
            current: Box::new(current),
            previous: Box::new(previous),
        }
    }

    /// No network, or the connection was lost.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionLost)
    }

    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::EmptyResponse)
    }

    /// Errors a read maps to an empty success when no fallback remains.
    pub fn is_absorbable(&self) -> bool {
        self.is_connectivity() || self.is_empty_response()
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decoding(e.to_string())
    }
}
