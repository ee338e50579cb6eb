//! Movie model and the tag parser that builds it

pub mod model;
pub mod tags;

pub use model::{Document, Header, Matrix, Place, Shape, Sprite};
pub use tags::parse_document;
