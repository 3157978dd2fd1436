pub(crate) mod algorithm;
mod bbox;
mod geometry;
mod measure;
mod validate;

pub use algorithm::pip::Location;
pub use bbox::BoundingBox;
pub use geometry::Geometry;
pub(crate) use measure::{line_length, polygon_area};
