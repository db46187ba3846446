//! Wire-level error codes carried in response payloads.
//!
//! `i16 = 0` means "no error"; [`ApiError::new`] mirrors that by returning
//! `None` for code zero so callers can `if let Some(err) = ...`.

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ApiError {
    UnknownTopicOrPartition,
    TopicAlreadyExists,
    LeaderNotAvailable,
    NoAvailablePartitions,
    PartitionUnavailable,
    RecordTooLarge,
    MessageSizeTooLarge,
    NotEnoughReplicas,
    InvalidRecord,
    OffsetOutOfRange,
    InvalidOffset,
    Unauthorized,
    InvalidCredentials,
    InvalidRequest,
    Unknown(i16),
}

impl ApiError {
    pub fn new(code: i16) -> Option<Self> {
        match code {
            0 => None,
            3 => Some(Self::UnknownTopicOrPartition),
            36 => Some(Self::TopicAlreadyExists),
            5 => Some(Self::LeaderNotAvailable),
            101 => Some(Self::NoAvailablePartitions),
            102 => Some(Self::PartitionUnavailable),
            10 => Some(Self::RecordTooLarge),
            87 => Some(Self::MessageSizeTooLarge),
            19 => Some(Self::NotEnoughReplicas),
            85 => Some(Self::InvalidRecord),
            1 => Some(Self::OffsetOutOfRange),
            103 => Some(Self::InvalidOffset),
            29 => Some(Self::Unauthorized),
            104 => Some(Self::InvalidCredentials),
            42 => Some(Self::InvalidRequest),
            other => Some(Self::Unknown(other)),
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            Self::UnknownTopicOrPartition => 3,
            Self::TopicAlreadyExists => 36,
            Self::LeaderNotAvailable => 5,
            Self::NoAvailablePartitions => 101,
            Self::PartitionUnavailable => 102,
            Self::RecordTooLarge => 10,
            Self::MessageSizeTooLarge => 87,
            Self::NotEnoughReplicas => 19,
            Self::InvalidRecord => 85,
            Self::OffsetOutOfRange => 1,
            Self::InvalidOffset => 103,
            Self::Unauthorized => 29,
            Self::InvalidCredentials => 104,
            Self::InvalidRequest => 42,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether the producer/consumer retry loop should treat this as
    /// transient.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::LeaderNotAvailable | Self::NotEnoughReplicas | Self::NoAvailablePartitions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_zero_is_no_error() {
        assert_eq!(ApiError::new(0), None);
    }

    proptest! {
        #[test]
        fn test_code_roundtrip(err: ApiError) {
            let err = match err {
                ApiError::Unknown(0) => ApiError::Unknown(1),
                other => other,
            };
            let code = err.code();
            assert_eq!(ApiError::new(code), Some(err));
        }
    }
}
