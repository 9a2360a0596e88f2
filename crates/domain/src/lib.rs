//! Mixit domain types.
//!
//! Pure data and invariants for the element-combination game: element ids,
//! validated names and icons, the canonical pair key, arcade goals, and the
//! entities that the engine persists. Nothing in this crate performs I/O.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{starter_elements, Combination, Discovery, Element, STARTER_ELEMENTS};
pub use error::DomainError;
pub use ids::{ElementId, OwnerId};
pub use value_objects::{
    normalize, CanonicalKey, ElementIcon, ElementName, Goal, MAX_ELEMENT_ICON_LENGTH,
    MAX_ELEMENT_NAME_LENGTH,
};
