//! Platform-version handshake: the cluster advertises a
//! `Major.Minor.Patch` string in its API-Version response, compared
//! lexicographically by component against the minimum this client
//! supports.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Malformed(format!("invalid version string: {s}")));
        };

        let parse_component = |c: &str| {
            c.parse::<u64>()
                .map_err(|_| Error::Malformed(format!("invalid version string: {s}")))
        };

        Ok(Self {
            major: parse_component(major)?,
            minor: parse_component(minor)?,
            patch: parse_component(patch)?,
        })
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Fails the handshake with [`Error::IncompatiblePlatformVersion`] unless
/// `cluster >= minimum`.
pub fn check_compatible(minimum: Version, cluster: Version) -> Result<(), Error> {
    if cluster >= minimum {
        Ok(())
    } else {
        Err(Error::IncompatiblePlatformVersion { minimum, cluster })
    }
}
