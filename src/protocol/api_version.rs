//! `i16` API-version tag carried in every request header.
//!
//! This protocol has no per-field version branching: each API key has a
//! single wire shape, so there is no `ApiVersionRange` negotiation --
//! compatibility is handled once, at connect time, via the platform
//! semver handshake in [`crate::version`].

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersion(pub i16);

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
