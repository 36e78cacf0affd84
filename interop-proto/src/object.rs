use core::{
    fmt::{self, Display},
    num::ParseIntError,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Identifies the object adapter hosting an object
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(u64);

/// Identifies an object within its adapter
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

/// A reference to a remote object
///
/// Two references denote the same object exactly when both their
/// host and id are equal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub host: HostId,
    pub id: ObjectId,
}

/// An error encountered while parsing a [`HostId`] or an [`ObjectId`]
#[derive(Debug, thiserror::Error)]
#[error("invalid identifier")]
pub struct ParseIdError(#[source] ParseIntError);

impl HostId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl ObjectId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl ObjectRef {
    #[must_use]
    pub const fn new(host: HostId, id: ObjectId) -> Self {
        Self { host, id }
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for HostId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self).map_err(ParseIdError)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self).map_err(ParseIdError)
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.id)
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok_eq};

    use super::{HostId, ObjectId, ObjectRef};

    #[test]
    fn display() {
        let object = ObjectRef::new(HostId::from_raw(0xbeef), ObjectId::from_raw(7));
        assert_eq!(object.to_string(), "000000000000beef/7");
    }

    #[test]
    fn parse() {
        assert_ok_eq!("000000000000beef".parse::<HostId>(), HostId::from_raw(0xbeef));
        assert_ok_eq!("42".parse::<ObjectId>(), ObjectId::from_raw(42));
        assert_err!("xyz".parse::<HostId>());
        assert_err!("-1".parse::<ObjectId>());
    }
}
