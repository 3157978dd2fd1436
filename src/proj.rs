use ahash::AHashMap;
use geo::Coord;
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::error::{GeoError, Result};
use crate::feature::Crs;
use crate::geom::Geometry;

/// Reprojects geometries between CRS tags. The engine never calls this on
/// its own; see [`crate::FeatureCollection::to_crs`].
pub trait Reproject {
    fn reproject(&self, geometry: &Geometry, from: &Crs, to: &Crs) -> Result<Geometry>;
}

/// [`Reproject`] backed by PROJ.4 definition strings.
///
/// Geographic CRSs take and return degrees.
#[derive(Debug, Clone)]
pub struct Proj4Reprojector {
    definitions: AHashMap<Crs, String>,
}

impl Default for Proj4Reprojector {
    fn default() -> Self {
        Self { definitions: AHashMap::new() }
            .with_definition(Crs::epsg(4326), "+proj=longlat +datum=WGS84 +no_defs +type=crs")
            .with_definition(Crs::epsg(4269), "+proj=longlat +datum=NAD83 +no_defs +type=crs")
            .with_definition(
                Crs::epsg(3857),
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs +type=crs",
            )
    }
}

impl Proj4Reprojector {
    pub fn new() -> Self { Self::default() }

    /// Register (or replace) the PROJ.4 definition for a tag.
    pub fn with_definition(mut self, crs: Crs, definition: impl Into<String>) -> Self {
        self.definitions.insert(crs, definition.into());
        self
    }

    #[inline] pub fn knows(&self, crs: &Crs) -> bool { self.definitions.contains_key(crs) }

    /// Build the projection for a tag, and whether it is geographic.
    fn projection(&self, crs: &Crs) -> Result<(Proj4, bool)> {
        let definition = self.definitions.get(crs)
            .ok_or_else(|| GeoError::Reprojection(format!("no PROJ.4 definition registered for {crs}")))?;
        let proj = Proj4::from_proj_string(definition)
            .map_err(|e| GeoError::Reprojection(format!("failed to build PROJ.4 {definition:?}: {e:?}")))?;
        let geographic = definition.contains("+proj=longlat") || definition.contains("+proj=latlong");
        Ok((proj, geographic))
    }
}

impl Reproject for Proj4Reprojector {
    fn reproject(&self, geometry: &Geometry, from: &Crs, to: &Crs) -> Result<Geometry> {
        if from == to { return Ok(geometry.clone()) }
        let (source, source_geographic) = self.projection(from)?;
        let (target, target_geographic) = self.projection(to)?;

        // Degrees in and out for geographic CRSs; PROJ works in radians.
        geometry.try_map_coords(&mut |coord: Coord<f64>| {
            let mut point = if source_geographic {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&source, &target, &mut point)
                .map_err(|e| GeoError::Reprojection(format!("{from} -> {to} failed at ({}, {}): {e:?}", coord.x, coord.y)))?;
            Ok(if target_geographic {
                Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
            } else {
                Coord { x: point.0, y: point.1 }
            })
        })
    }
}
