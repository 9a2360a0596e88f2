//! Order-independent key for a pair of elements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::ElementId;

const SEPARATOR: char = '+';

/// Canonical key for an unordered pair of element ids.
///
/// `CanonicalKey::new(a, b) == CanonicalKey::new(b, a)` for all ids. The pair
/// is sorted by the ids' total order, so `first <= second` always holds.
/// An element combined with itself is a valid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalKey {
    first: ElementId,
    second: ElementId,
}

impl CanonicalKey {
    pub fn new(a: ElementId, b: ElementId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn first(&self) -> ElementId {
        self.first
    }

    pub fn second(&self) -> ElementId {
        self.second
    }

    /// True when both sides of the pair are the same element.
    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }

    /// True when `id` is one of the two inputs.
    pub fn involves(&self, id: ElementId) -> bool {
        self.first == id || self.second == id
    }
}

/// Build the canonical key for two element ids.
pub fn normalize(a: ElementId, b: ElementId) -> CanonicalKey {
    CanonicalKey::new(a, b)
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, SEPARATOR, self.second)
    }
}

impl FromStr for CanonicalKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| DomainError::parse(format!("Canonical key without separator: {s}")))?;
        let a: ElementId = a.parse()?;
        let b: ElementId = b.parse()?;
        let key = Self::new(a, b);
        if key.first != a {
            return Err(DomainError::parse(format!(
                "Canonical key is not in canonical order: {s}"
            )));
        }
        Ok(key)
    }
}

impl TryFrom<String> for CanonicalKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CanonicalKey> for String {
    fn from(key: CanonicalKey) -> String {
        key.to_string()
    }
}
