//! Oracle response validation.

use std::sync::LazyLock;

use mixit_domain::{ElementIcon, ElementName, Goal};
use regex::Regex;

use crate::infrastructure::config::ValidationLimits;
use crate::infrastructure::ports::{OracleError, RawOracleResponse};

static GOAL_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N} -]+(, [\p{L}\p{N} -]+)+$").expect("valid regex")
});

/// A name and icon that passed validation and can be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    pub name: ElementName,
    pub icon: ElementIcon,
}

/// Checks untrusted oracle output before anything touches the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleResponseValidator {
    limits: ValidationLimits,
}

impl OracleResponseValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, raw: RawOracleResponse) -> Result<ValidatedResponse, OracleError> {
        let cleaned = raw
            .name
            .as_deref()
            .map(clean)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| OracleError::validation("Response has no element name"))?;
        let name = self.name(cleaned)?;

        let icon = raw
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| OracleError::validation("Response has no icon"))?;

        let icon_len = icon.chars().count();
        if icon_len > self.limits.max_icon_length {
            return Err(OracleError::validation(format!(
                "Icon is {icon_len} characters, limit is {}",
                self.limits.max_icon_length
            )));
        }

        Ok(ValidatedResponse {
            name,
            icon: ElementIcon::new(icon).map_err(|e| OracleError::validation(e.to_string()))?,
        })
    }

    /// Parse a proposed arcade goal: `Word, Variant, Variant`, at least two
    /// entries, letters, digits, spaces and hyphens only. The goal word must
    /// not be one of `excluded`.
    pub fn validate_goal(&self, raw: &str, excluded: &[ElementName]) -> Result<Goal, OracleError> {
        let text = raw.trim().trim_end_matches('.');
        if !GOAL_LIST_RE.is_match(text) {
            return Err(OracleError::validation(format!(
                "Goal is not a comma-separated word list: {text}"
            )));
        }

        let mut names = text
            .split(", ")
            .map(|entry| self.name(entry))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let word = names
            .next()
            .ok_or_else(|| OracleError::validation("Goal list is empty"))?;

        if excluded.iter().any(|e| e.normalized() == word.normalized()) {
            return Err(OracleError::validation(format!("Goal word {word} was excluded")));
        }

        Ok(Goal::new(word, names))
    }

    /// Length is measured on the stored form, after whitespace is collapsed.
    fn name(&self, text: &str) -> Result<ElementName, OracleError> {
        let name = ElementName::new(text).map_err(|e| OracleError::validation(e.to_string()))?;
        if name.char_len() > self.limits.max_name_length {
            return Err(OracleError::validation(format!(
                "Element name is {} characters, limit is {}",
                name.char_len(),
                self.limits.max_name_length
            )));
        }
        Ok(name)
    }
}

/// Strip wrapping quotes and trailing punctuation models like to add.
fn clean(name: &str) -> &str {
    name.trim()
        .trim_end_matches(['.', '!'])
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim()
}
