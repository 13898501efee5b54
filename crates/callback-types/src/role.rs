//! # Roles
//!
//! A role is one simulated network participant with its own inbound
//! callback endpoint. Roles are named `<kind><index>`, e.g. `rp1`, `idp2`.
//! The NDID registrar is a singleton and may omit the index.

use crate::errors::TypesError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of participant in the identity network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleKind {
    /// Relying Party.
    Rp,
    /// Identity Provider.
    Idp,
    /// Authoritative Source.
    As,
    /// NDID registrar.
    Ndid,
    /// Proxy node acting for several nodes.
    Proxy,
}

impl RoleKind {
    /// Wire prefix used in role identifiers.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Rp => "rp",
            Self::Idp => "idp",
            Self::As => "as",
            Self::Ndid => "ndid",
            Self::Proxy => "proxy",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "rp" => Some(Self::Rp),
            "idp" => Some(Self::Idp),
            "as" => Some(Self::As),
            "ndid" => Some(Self::Ndid),
            "proxy" => Some(Self::Proxy),
            _ => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifier of a simulated node, e.g. `rp1`, `idp2`, `as1`, `proxy1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId {
    kind: RoleKind,
    index: u16,
}

impl RoleId {
    /// Create a role from kind and 1-based index.
    #[must_use]
    pub const fn new(kind: RoleKind, index: u16) -> Self {
        Self { kind, index }
    }

    /// Relying party `rp<n>`.
    #[must_use]
    pub const fn rp(index: u16) -> Self {
        Self::new(RoleKind::Rp, index)
    }

    /// Identity provider `idp<n>`.
    #[must_use]
    pub const fn idp(index: u16) -> Self {
        Self::new(RoleKind::Idp, index)
    }

    /// Authoritative source `as<n>`.
    #[must_use]
    pub const fn as_(index: u16) -> Self {
        Self::new(RoleKind::As, index)
    }

    /// The NDID registrar (`ndid1`).
    #[must_use]
    pub const fn ndid() -> Self {
        Self::new(RoleKind::Ndid, 1)
    }

    /// Proxy `proxy<n>`.
    #[must_use]
    pub const fn proxy(index: u16) -> Self {
        Self::new(RoleKind::Proxy, index)
    }

    /// Participant kind.
    #[must_use]
    pub const fn kind(&self) -> RoleKind {
        self.kind
    }

    /// 1-based index within the kind.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Upper-case form used in environment variable names (`IDP2`).
    #[must_use]
    pub fn env_key(&self) -> String {
        self.to_string().to_uppercase()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

impl FromStr for RoleId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let split = normalized
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(normalized.len());
        let (prefix, digits) = normalized.split_at(split);

        let kind =
            RoleKind::from_prefix(prefix).ok_or_else(|| TypesError::UnknownRole(s.to_string()))?;

        let index = if digits.is_empty() {
            if kind != RoleKind::Ndid {
                return Err(TypesError::InvalidRoleIndex(s.to_string()));
            }
            1
        } else {
            digits
                .parse::<u16>()
                .ok()
                .filter(|i| *i > 0)
                .ok_or_else(|| TypesError::InvalidRoleIndex(s.to_string()))?
        };

        Ok(Self { kind, index })
    }
}

impl Serialize for RoleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
