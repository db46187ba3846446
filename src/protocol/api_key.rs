//! ApiKey to tag request types.
//!
//! Only the keys this crate's wire frame actually uses; unknown codes
//! decode to [`ApiKey::Unknown`] rather than erroring so forward-compatible
//! clusters don't break on a stray broker-only message.

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ApiKey {
    Produce,
    Fetch,
    StreamFetch,
    Metadata,
    CreateTopics,
    DeleteTopics,
    ApiVersions,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(key: i16) -> Self {
        match key {
            0 => Self::Produce,
            1 => Self::Fetch,
            2 => Self::StreamFetch,
            3 => Self::Metadata,
            19 => Self::CreateTopics,
            20 => Self::DeleteTopics,
            18 => Self::ApiVersions,
            _ => Self::Unknown(key),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Produce => 0,
            ApiKey::Fetch => 1,
            ApiKey::StreamFetch => 2,
            ApiKey::Metadata => 3,
            ApiKey::CreateTopics => 19,
            ApiKey::DeleteTopics => 20,
            ApiKey::ApiVersions => 18,
            ApiKey::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_roundrip_int16(code: i16) {
            let api_key = ApiKey::from(code);
            let code2 = i16::from(api_key);
            assert_eq!(code, code2);
        }

        #[test]
        fn test_roundrip_api_key(key: ApiKey) {
            let key = match key {
                // Ensure key is actually unknown
                ApiKey::Unknown(x) => ApiKey::from(x),
                _ => key,
            };

            let code = i16::from(key);
            let key2 = ApiKey::from(code);
            assert_eq!(key, key2);
        }
    }
}
