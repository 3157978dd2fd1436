use crate::error::{GeoError, Result};
use crate::feature::{AttrValue, Attributes};
use crate::geom::{BoundingBox, Geometry};

/// One geometry plus its attributes. Immutable: the `with_*` methods return
/// a new feature.
///
/// The geometry is validated once, at construction. An invalid geometry is
/// kept (so batch operations can report it per item) and surfaces as
/// `geometry-invalid` from [`Feature::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    geometry: Geometry,
    attributes: Attributes,
    bbox: Option<BoundingBox>,
    issue: Option<String>,
}

impl Feature {
    pub fn new<K, V>(geometry: Geometry, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let attributes = attributes.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::from_parts(geometry, attributes)
    }

    /// A feature with no attributes.
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self::from_parts(geometry, Attributes::new())
    }

    pub(crate) fn from_parts(geometry: Geometry, attributes: Attributes) -> Self {
        let issue = match geometry.validate() {
            Ok(()) => None,
            Err(GeoError::GeometryInvalid(msg)) => Some(msg),
            Err(other) => Some(other.to_string()),
        };
        Self {
            bbox: geometry.bounding_box(),
            geometry,
            attributes,
            issue,
        }
    }

    #[inline] pub fn geometry(&self) -> &Geometry { &self.geometry }

    #[inline] pub fn attributes(&self) -> &Attributes { &self.attributes }

    /// Attribute by name, `None` when absent.
    #[inline] pub fn get(&self, name: &str) -> Option<&AttrValue> { self.attributes.get(name) }

    /// Cached bounding box of the geometry (`None` when empty).
    #[inline] pub fn bbox(&self) -> Option<BoundingBox> { self.bbox }

    #[inline] pub fn is_valid(&self) -> bool { self.issue.is_none() }

    /// The geometry, or the validation error recorded at construction.
    pub fn check(&self) -> Result<&Geometry> {
        match &self.issue {
            None => Ok(&self.geometry),
            Some(msg) => Err(GeoError::GeometryInvalid(msg.clone())),
        }
    }

    /// Copy with one attribute set (added or replaced).
    pub fn with_attribute(&self, name: impl Into<String>, value: impl Into<AttrValue>) -> Feature {
        let mut attributes = self.attributes.clone();
        attributes.insert(name.into(), value.into());
        Feature { attributes, ..self.clone() }
    }

    /// Copy with a different geometry; attributes are kept.
    pub fn with_geometry(&self, geometry: Geometry) -> Feature {
        Feature::from_parts(geometry, self.attributes.clone())
    }

    pub fn into_parts(self) -> (Geometry, Attributes) { (self.geometry, self.attributes) }
}
