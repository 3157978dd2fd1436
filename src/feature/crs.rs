use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque coordinate reference system tag, e.g. `"EPSG:4326"`.
///
/// Tags are compared verbatim; the engine never interprets them. Converting
/// between systems goes through a [`crate::Reproject`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(tag: impl Into<String>) -> Self { Self(tag.into()) }

    /// Tag for an EPSG code, `"EPSG:<code>"`.
    pub fn epsg(code: u32) -> Self { Self(format!("EPSG:{code}")) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Crs {
    fn from(tag: &str) -> Self { Crs::new(tag) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_tags_compare_verbatim() {
        assert_eq!(Crs::epsg(4326), Crs::new("EPSG:4326"));
        assert_ne!(Crs::new("epsg:4326"), Crs::epsg(4326));
        assert_eq!(Crs::epsg(2230).to_string(), "EPSG:2230");
    }
}
