//! Identifier newtypes for assets, users, and proposals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A shared-asset identifier, always prefixed with `veh_`.
///
/// Assets are created by the fleet-management side of the platform; the
/// governance engine treats the id as opaque beyond the prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    /// The standard prefix for all asset identifiers.
    pub const PREFIX: &'static str = "veh_";

    /// Create a new asset id from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `veh_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "asset id must start with veh_");
        Self(s)
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this id is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A platform user identifier, always prefixed with `usr_`.
///
/// Co-owners, proposers, and voters are all referenced by `UserId`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// The standard prefix for all user identifiers.
    pub const PREFIX: &'static str = "usr_";

    /// Create a new user id from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `usr_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "user id must start with usr_");
        Self(s)
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this id is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A proposal identifier.
///
/// Allocated sequentially by the governance engine from a persisted counter,
/// so ids remain unique across restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(u64);

impl ProposalId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop-{}", self.0)
    }
}
