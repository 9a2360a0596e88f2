//! Validated name newtypes for elements
//!
//! These newtypes ensure that element names and icons are valid by construction:
//! - Non-empty
//! - Within length limits (counted in characters, not bytes)
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Hard upper bound for element names. Oracle validation may apply a tighter limit.
pub const MAX_ELEMENT_NAME_LENGTH: usize = 64;

/// Hard upper bound for element icons (an emoji sequence, possibly with modifiers).
pub const MAX_ELEMENT_ICON_LENGTH: usize = 16;

// ============================================================================
// ElementName
// ============================================================================

/// A validated element name (non-empty, <=64 chars, trimmed, inner whitespace collapsed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementName(String);

impl ElementName {
    /// Create a new validated element name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The name is empty after trimming
    /// - The name exceeds 64 characters after trimming
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(DomainError::validation("Element name cannot be empty"));
        }
        if collapsed.chars().count() > MAX_ELEMENT_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Element name cannot exceed {} characters",
                MAX_ELEMENT_NAME_LENGTH
            )));
        }
        Ok(Self(collapsed))
    }

    /// Returns the display form of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-normalized form used for uniqueness and lookups.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Number of characters in the display form.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ElementName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ElementName> for String {
    fn from(name: ElementName) -> String {
        name.0
    }
}

// ============================================================================
// ElementIcon
// ============================================================================

/// A validated element icon (non-empty, <=16 chars, trimmed, no inner whitespace)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementIcon(String);

impl ElementIcon {
    /// Create a new validated element icon.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the icon is empty, contains
    /// whitespace, or exceeds 16 characters after trimming.
    pub fn new(icon: impl Into<String>) -> Result<Self, DomainError> {
        let icon = icon.into();
        let trimmed = icon.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Element icon cannot be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                "Element icon cannot contain whitespace",
            ));
        }
        if trimmed.chars().count() > MAX_ELEMENT_ICON_LENGTH {
            return Err(DomainError::validation(format!(
                "Element icon cannot exceed {} characters",
                MAX_ELEMENT_ICON_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for ElementIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ElementIcon {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ElementIcon> for String {
    fn from(icon: ElementIcon) -> String {
        icon.0
    }
}
