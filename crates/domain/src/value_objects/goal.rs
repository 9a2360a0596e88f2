//! Arcade goal: a target word and the other names that count as reaching it.

use serde::{Deserialize, Serialize};

use super::names::ElementName;

/// A goal for arcade mode.
///
/// The player wins by discovering an element whose name matches the goal
/// word or one of its variants, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    word: ElementName,
    variants: Vec<ElementName>,
}

impl Goal {
    /// Variants equal to the word or to an earlier variant are dropped.
    pub fn new(word: ElementName, variants: impl IntoIterator<Item = ElementName>) -> Self {
        let mut seen = vec![word.normalized()];
        let variants = variants
            .into_iter()
            .filter(|v| {
                let normalized = v.normalized();
                if seen.contains(&normalized) {
                    false
                } else {
                    seen.push(normalized);
                    true
                }
            })
            .collect();

        Self { word, variants }
    }

    /// The word shown to the player.
    pub fn word(&self) -> &ElementName {
        &self.word
    }

    pub fn variants(&self) -> &[ElementName] {
        &self.variants
    }

    /// The goal word followed by its variants.
    pub fn accepted_names(&self) -> impl Iterator<Item = &ElementName> {
        std::iter::once(&self.word).chain(&self.variants)
    }

    pub fn is_reached_by(&self, name: &ElementName) -> bool {
        let normalized = name.normalized();
        self.accepted_names().any(|n| n.normalized() == normalized)
    }
}
