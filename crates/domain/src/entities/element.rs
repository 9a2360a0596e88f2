//! Element entity - A discovered thing that can be combined with other elements
//!
//! Elements are created the first time a combination yields a name that the
//! catalog has not seen, and are immutable afterwards. Combination rows and
//! inventories reference them by id, so they are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ElementId;
use crate::value_objects::{ElementIcon, ElementName};

/// A discovered element.
///
/// The id is derived from the case-normalized name, so two elements whose
/// names differ only in case share an id and can never both exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: ElementName,
    pub icon: ElementIcon,
    pub created_at: DateTime<Utc>,
}

impl Element {
    pub fn new(name: ElementName, icon: ElementIcon, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ElementId::for_normalized_name(&name.normalized()),
            name,
            icon,
            created_at,
        }
    }

    /// Case-normalized name, the uniqueness key of the catalog.
    pub fn normalized_name(&self) -> String {
        self.name.normalized()
    }

    /// Display label in the `<icon> <name>` form used by chips and prompts.
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.icon, self.name)
    }
}

/// Name and icon of the four elements every player starts with.
pub const STARTER_ELEMENTS: [(&str, &str); 4] = [
    ("Water", "💧"),
    ("Earth", "🌍"),
    ("Fire", "🔥"),
    ("Air", "🌬️"),
];

/// Build the starter elements with the given creation time.
pub fn starter_elements(created_at: DateTime<Utc>) -> Result<Vec<Element>, DomainError> {
    STARTER_ELEMENTS
        .iter()
        .map(|(name, icon)| {
            Ok(Element::new(
                ElementName::new(*name)?,
                ElementIcon::new(*icon)?,
                created_at,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, icon: &str) -> Element {
        Element::new(
            ElementName::new(name).unwrap(),
            ElementIcon::new(icon).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn id_ignores_name_case() {
        assert_eq!(element("Steam", "💨").id, element("steam", "☁️").id);
        assert_ne!(element("Steam", "💨").id, element("Mud", "🟤").id);
    }

    #[test]
    fn label_puts_icon_first() {
        assert_eq!(element("Fire", "🔥").label(), "🔥 Fire");
    }

    #[test]
    fn starter_elements_are_valid_and_distinct() {
        let starters = starter_elements(Utc::now()).unwrap();
        assert_eq!(starters.len(), 4);
        let mut ids: Vec<_> = starters.iter().map(|e| e.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
