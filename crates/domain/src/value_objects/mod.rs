//! Value objects - Immutable objects defined by their attributes

mod canonical_key;
mod goal;
mod names;

pub use canonical_key::{normalize, CanonicalKey};
pub use goal::Goal;
pub use names::{ElementIcon, ElementName, MAX_ELEMENT_ICON_LENGTH, MAX_ELEMENT_NAME_LENGTH};
