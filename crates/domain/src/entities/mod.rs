//! Domain entities - Core business objects with identity

mod combination;
mod discovery;
mod element;

pub use combination::Combination;
pub use discovery::Discovery;
pub use element::{starter_elements, Element, STARTER_ELEMENTS};
