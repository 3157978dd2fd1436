use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{GeoError, Result};
use crate::feature::{AttrValue, Crs, Feature};
use crate::geom::{BoundingBox, Geometry};
use crate::index::SpatialIndex;
use crate::proj::Reproject;

/// An ordered set of features sharing one CRS tag.
///
/// Collections are values: every transform returns a new collection and the
/// input is left untouched. There is no implicit "active geometry column";
/// switching to centroids or reprojected shapes produces a distinct collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    crs: Crs,
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn empty(crs: Crs) -> Self { Self::new(crs, Vec::new()) }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn features(&self) -> &[Feature] { &self.features }

    #[inline] pub fn get(&self, ordinal: usize) -> Option<&Feature> { self.features.get(ordinal) }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Feature> + '_ { self.features.iter() }

    pub fn into_features(self) -> Vec<Feature> { self.features }

    /// Fail with `crs-mismatch` unless both collections carry the same tag.
    pub fn ensure_same_crs(&self, other: &FeatureCollection) -> Result<()> {
        if self.crs != other.crs {
            return Err(GeoError::CrsMismatch { left: self.crs.clone(), right: other.crs.clone() });
        }
        Ok(())
    }

    /// Bounding box of every feature.
    pub fn total_bounds(&self) -> Result<BoundingBox> {
        self.features.iter()
            .filter_map(Feature::bbox)
            .reduce(|a, b| a.union(&b))
            .ok_or(GeoError::EmptyCollection("total_bounds"))
    }

    /// Values of one attribute in feature order; `Null` where absent.
    pub fn column(&self, name: &str) -> Vec<AttrValue> {
        self.features.iter()
            .map(|f| f.get(name).cloned().unwrap_or_default())
            .collect()
    }

    /// Features matching `keep`, in order.
    pub fn filter(&self, mut keep: impl FnMut(&Feature) -> bool) -> FeatureCollection {
        let features = self.features.iter().filter(|f| keep(f)).cloned().collect();
        FeatureCollection::new(self.crs.clone(), features)
    }

    /// Replace the geometry of every feature, by ordinal.
    pub fn with_geometry(&self, geometries: Vec<Geometry>) -> Result<FeatureCollection> {
        if geometries.len() != self.features.len() {
            return Err(GeoError::InvalidQuery(format!(
                "{} geometries supplied for {} features", geometries.len(), self.features.len()
            )));
        }
        let features = self.features.iter()
            .zip(geometries)
            .map(|(feature, geometry)| feature.with_geometry(geometry))
            .collect();
        Ok(FeatureCollection::new(self.crs.clone(), features))
    }

    /// Derive a new geometry for every feature, keeping attributes.
    /// Stops at the first failure.
    pub fn map_geometry(&self, f: impl Fn(&Feature) -> Result<Geometry> + Sync) -> Result<FeatureCollection> {
        let geometries = if EngineConfig::default().run_parallel(self.len()) {
            self.features.par_iter().map(&f).collect::<Result<Vec<_>>>()?
        } else {
            self.features.iter().map(&f).collect::<Result<Vec<_>>>()?
        };
        self.with_geometry(geometries)
    }

    /// Distance from every feature to `other`, in feature order. Stops at the
    /// first invalid feature.
    pub fn distance(&self, other: &Geometry) -> Result<Vec<f64>> {
        let measure = |f: &Feature| f.check()?.distance(other);
        if EngineConfig::default().run_parallel(self.len()) {
            self.features.par_iter().map(measure).collect()
        } else {
            self.features.iter().map(measure).collect()
        }
    }

    /// Distance between features sharing an ordinal in `self` and `other`.
    /// Ordinals past the end of `other` give `None`.
    pub fn distance_aligned(&self, other: &FeatureCollection) -> Result<Vec<Option<f64>>> {
        self.ensure_same_crs(other)?;
        self.features.iter().enumerate()
            .map(|(i, f)| match other.get(i) {
                Some(g) => f.check()?.distance(g.check()?).map(Some),
                None => Ok(None),
            })
            .collect()
    }

    /// Same features with their centroids as geometry.
    pub fn centroids(&self) -> Result<FeatureCollection> {
        self.map_geometry(|f| f.check()?.centroid().map(Geometry::Point))
    }

    /// Same features with an interior point as geometry.
    pub fn representative_points(&self) -> Result<FeatureCollection> {
        self.map_geometry(|f| f.check()?.representative_point().map(Geometry::Point))
    }

    /// Build an R-tree over this collection.
    pub fn sindex(&self) -> SpatialIndex { SpatialIndex::build(self) }

    /// Union of every feature geometry.
    pub fn unary_union(&self) -> Result<Geometry> {
        let geometries = self.features.iter()
            .map(|f| f.check().cloned())
            .collect::<Result<Vec<_>>>()?;
        crate::predicate::unary_union(&geometries)
    }

    /// Reproject into `target` through the supplied collaborator. Returns an
    /// unchanged copy when the tags already match; never called implicitly.
    pub fn to_crs(&self, target: &Crs, reprojector: &(impl Reproject + ?Sized)) -> Result<FeatureCollection> {
        if &self.crs == target {
            return Ok(self.clone());
        }
        let features = self.features.iter()
            .map(|f| Ok(f.with_geometry(reprojector.reproject(f.geometry(), &self.crs, target)?)))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(from = %self.crs, to = %target, features = features.len(), "reprojected collection");
        Ok(FeatureCollection::new(target.clone(), features))
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter { self.features.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parks() -> FeatureCollection {
        FeatureCollection::new(Crs::epsg(2230), vec![
            Feature::new(Geometry::rect(0.0, 0.0, 2.0, 2.0), [("name", "Balboa")]),
            Feature::new(Geometry::rect(5.0, 5.0, 6.0, 8.0), [("name", "Mission Trails")]),
        ])
    }

    #[test]
    fn total_bounds_and_empty() {
        assert_eq!(parks().total_bounds().unwrap(), BoundingBox::new(0.0, 0.0, 6.0, 8.0));
        let empty = FeatureCollection::empty(Crs::epsg(4326));
        assert_eq!(empty.total_bounds().unwrap_err().kind(), "empty-collection");
    }

    #[test]
    fn centroids_are_a_new_collection() {
        let parks = parks();
        let centroids = parks.centroids().unwrap();

        assert_eq!(centroids.get(0).unwrap().geometry(), &Geometry::point(1.0, 1.0));
        assert_eq!(centroids.get(1).unwrap().get("name"), Some(&AttrValue::from("Mission Trails")));
        // Input untouched.
        assert!(matches!(parks.get(0).unwrap().geometry(), Geometry::Polygon(_)));
    }

    #[test]
    fn with_geometry_requires_matching_length() {
        let err = parks().with_geometry(vec![Geometry::point(0.0, 0.0)]).unwrap_err();
        assert_eq!(err.kind(), "invalid-query");
    }

    #[test]
    fn crs_mismatch_fails_fast() {
        let a = parks();
        let b = FeatureCollection::empty(Crs::epsg(4326));
        assert_eq!(a.ensure_same_crs(&b).unwrap_err().kind(), "crs-mismatch");
        assert!(a.ensure_same_crs(&a.clone()).is_ok());
    }

    #[test]
    fn distances_to_one_geometry_and_between_neighbours() {
        let parks = parks();
        let lake = Geometry::rect(0.0, 4.0, 2.0, 5.0);
        let to_lake = parks.distance(&lake).unwrap();
        assert_eq!(to_lake.len(), 2);
        assert!((to_lake[0] - 2.0).abs() < 1e-12);
        assert!((to_lake[1] - 3.0).abs() < 1e-12);

        // Each park against the one after it.
        let next = FeatureCollection::new(Crs::epsg(2230), parks.features()[1..].to_vec());
        let gaps = parks.distance_aligned(&next).unwrap();
        assert_eq!(gaps.len(), 2);
        assert!((gaps[0].unwrap() - 18f64.sqrt()).abs() < 1e-12);
        assert_eq!(gaps[1], None);

        let elsewhere = FeatureCollection::empty(Crs::epsg(4326));
        assert_eq!(parks.distance_aligned(&elsewhere).unwrap_err().kind(), "crs-mismatch");
    }

    #[test]
    fn column_fills_missing_with_null() {
        let mut parks = parks().into_features();
        parks.push(Feature::from_geometry(Geometry::point(9.0, 9.0)));
        let parks = FeatureCollection::new(Crs::epsg(2230), parks);
        assert_eq!(parks.column("name")[2], AttrValue::Null);
        assert_eq!(parks.filter(|f| f.get("name").is_some()).len(), 2);
    }
}
