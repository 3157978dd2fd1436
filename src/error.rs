use crate::feature::Crs;

/// Errors produced by the geometry engine.
///
/// Batch operations (spatial join, dissolve) report these per item instead of
/// aborting; everything else returns them directly to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("invalid geometry: {0}")]
    GeometryInvalid(String),

    #[error("operation {op} is undefined for {left} and {right}")]
    DimensionMismatch { op: &'static str, left: &'static str, right: &'static str },

    #[error("CRS mismatch: {left} vs {right}")]
    CrsMismatch { left: Crs, right: Crs },

    #[error("{0} requires at least one feature")]
    EmptyCollection(&'static str),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("reprojection failed: {0}")]
    Reprojection(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl GeoError {
    /// Stable kebab-case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoError::GeometryInvalid(_) => "geometry-invalid",
            GeoError::DimensionMismatch { .. } => "dimension-mismatch",
            GeoError::CrsMismatch { .. } => "crs-mismatch",
            GeoError::EmptyCollection(_) => "empty-collection",
            GeoError::InvalidQuery(_) => "invalid-query",
            GeoError::InvalidAttribute { .. } => "invalid-attribute",
            GeoError::Reprojection(_) => "reprojection",
            GeoError::Cancelled => "cancelled",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GeoError::GeometryInvalid(msg.into())
    }

    pub(crate) fn attribute(name: &str, reason: impl Into<String>) -> Self {
        GeoError::InvalidAttribute { name: name.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_kebab_case() {
        assert_eq!(GeoError::invalid("ring").kind(), "geometry-invalid");
        assert_eq!(GeoError::EmptyCollection("dissolve").kind(), "empty-collection");
        assert_eq!(
            GeoError::CrsMismatch { left: Crs::new("EPSG:4326"), right: Crs::new("EPSG:3857") }.kind(),
            "crs-mismatch"
        );
    }

    #[test]
    fn display_names_both_crs() {
        let err = GeoError::CrsMismatch { left: Crs::new("EPSG:4326"), right: Crs::new("EPSG:2230") };
        assert_eq!(err.to_string(), "CRS mismatch: EPSG:4326 vs EPSG:2230");
    }
}
