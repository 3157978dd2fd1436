mod collection;
mod crs;
mod feature;
mod value;

pub use collection::FeatureCollection;
pub use crs::Crs;
pub use feature::Feature;
pub use value::{AttrValue, Attributes, attributes_from_json};
