//! # Identifier Newtypes
//!
//! Distinct types for every identifier namespace so a `ScanId` can never be
//! passed where a `SessionId` is expected.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// One operator's pass through the configuration, scan, review and
    /// approval stages.
    SessionId,
    "session"
);

uuid_id!(
    /// One run of the check plan. A reset orphans the running scan by
    /// replacing the session's current scan id.
    ScanId,
    "scan"
);

uuid_id!(
    /// An entry in the governance feedback log.
    FeedbackId,
    "feedback"
);

/// Identifier of a catalog check, lowercase kebab-case (`tls-in-transit`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckId(String);

impl CheckId {
    /// Validate and wrap a check identifier.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let valid = !s.is_empty()
            && !s.starts_with('-')
            && !s.ends_with('-')
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidCheckId(s))
        }
    }

    /// Wrap an identifier from the static catalog. The catalog's own tests
    /// validate every entry.
    pub(crate) fn from_static(s: &'static str) -> Self {
        Self(s.to_string())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CheckId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CheckId> for String {
    fn from(id: CheckId) -> Self {
        id.0
    }
}

/// Approval reference handed to the approver, `APP-` followed by six digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApprovalId(String);

impl ApprovalId {
    /// Smallest numeric part.
    pub const MIN: u32 = 100_000;
    /// Largest numeric part.
    pub const MAX: u32 = 999_999;

    /// Draw a random approval id. Uniqueness against existing approvals is
    /// the ledger's job.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self::from_number(rng.gen_range(Self::MIN..=Self::MAX))
    }

    fn from_number(n: u32) -> Self {
        Self(format!("APP-{n}"))
    }

    /// Parse `APP-NNNNNN`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidApprovalId(s.to_string());
        let digits = s.strip_prefix("APP-").ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u32 = digits.parse().map_err(|_| invalid())?;
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(invalid());
        }
        Ok(Self::from_number(n))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApprovalId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ApprovalId> for String {
    fn from(id: ApprovalId) -> Self {
        id.0
    }
}
