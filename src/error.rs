//! Crate-root error type: every fallible operation in this crate
//! returns [`Error`] (or a type convertible into it) so callers can match
//! on a single enum regardless of which subsystem failed.

use thiserror::Error;

use crate::protocol::error::ApiError;
use crate::protocol::traits::{ReadError, WriteError};
use crate::version::Version;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // --- Connection ---
    #[error("failed to connect to {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {endpoint} was lost")]
    Disconnected { endpoint: String },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("client was closed")]
    Closed,

    // --- Protocol ---
    #[error("truncated frame: {0}")]
    TruncatedFrame(String),

    #[error("malformed protocol data: {0}")]
    Malformed(String),

    #[error("unsupported API version")]
    UnsupportedApiVersion,

    // --- Compatibility ---
    #[error("cluster platform version {cluster} is older than the minimum supported {minimum}")]
    IncompatiblePlatformVersion { minimum: Version, cluster: Version },

    // --- Topic/Partition ---
    #[error("unknown topic or partition")]
    UnknownTopicOrPartition,

    #[error("topic already exists")]
    TopicAlreadyExists,

    #[error("leader not available")]
    LeaderNotAvailable,

    #[error("no available partitions")]
    NoAvailablePartitions,

    #[error("partition {requested} unavailable, available partitions: {available:?}")]
    PartitionUnavailable { requested: i32, available: Vec<i32> },

    // --- Produce ---
    #[error("record too large for max_request_size")]
    RecordTooLarge,

    #[error("message size too large")]
    MessageSizeTooLarge,

    #[error("not enough replicas")]
    NotEnoughReplicas,

    #[error("invalid record")]
    InvalidRecord,

    // --- Consume ---
    #[error("offset out of range")]
    OffsetOutOfRange,

    #[error("invalid offset")]
    InvalidOffset,

    // --- Auth ---
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    // --- Internal ---
    #[error("operation cancelled")]
    Cancelled,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl Error {
    /// Whether the producer/consumer retry loop should treat this as
    /// transient: connection errors, leader-not-available,
    /// not-enough-replicas and timeouts are retried; everything else
    /// surfaces to the caller immediately.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::Disconnected { .. }
                | Self::Timeout(_)
                | Self::LeaderNotAvailable
                | Self::NotEnoughReplicas
        )
    }

    pub fn from_api_error(err: ApiError) -> Self {
        match err {
            ApiError::UnknownTopicOrPartition => Self::UnknownTopicOrPartition,
            ApiError::TopicAlreadyExists => Self::TopicAlreadyExists,
            ApiError::LeaderNotAvailable => Self::LeaderNotAvailable,
            ApiError::NoAvailablePartitions => Self::NoAvailablePartitions,
            ApiError::PartitionUnavailable => Self::PartitionUnavailable {
                requested: -1,
                available: vec![],
            },
            ApiError::RecordTooLarge => Self::RecordTooLarge,
            ApiError::MessageSizeTooLarge => Self::MessageSizeTooLarge,
            ApiError::NotEnoughReplicas => Self::NotEnoughReplicas,
            ApiError::InvalidRecord => Self::InvalidRecord,
            ApiError::OffsetOutOfRange => Self::OffsetOutOfRange,
            ApiError::InvalidOffset => Self::InvalidOffset,
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::InvalidCredentials => Self::InvalidCredentials,
            ApiError::InvalidRequest => Self::Malformed("invalid request".into()),
            ApiError::Unknown(code) => Self::Malformed(format!("unknown broker error {code}")),
        }
    }
}
