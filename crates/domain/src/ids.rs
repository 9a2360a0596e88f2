use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    crate::error::DomainError::invalid_id(format!(
                        "{}: {}",
                        stringify!($name),
                        e
                    ))
                })
            }
        }
    };
}

define_id!(ElementId);
define_id!(OwnerId);

/// Namespace for name-derived element ids. Changing it re-keys every stored
/// combination, so it is fixed for the lifetime of the data format.
const ELEMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d69_7869_745f_656c_656d_656e_745f_6e73);

impl ElementId {
    /// Derive the id of an element from its case-normalized name.
    ///
    /// The same name yields the same id on every installation, which keeps
    /// canonical keys comparable across devices.
    pub fn for_normalized_name(normalized: &str) -> Self {
        Self(Uuid::new_v5(&ELEMENT_NAMESPACE, normalized.as_bytes()))
    }
}
