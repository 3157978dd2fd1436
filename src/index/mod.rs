use geo::Point;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject, AABB};

use crate::config::EngineConfig;
use crate::error::{GeoError, Result};
use crate::feature::FeatureCollection;
use crate::geom::BoundingBox;

/// A bounding box in an R-tree, associated with a feature by ordinal.
#[derive(Debug, Clone)]
struct IndexedBox {
    idx: usize, // Ordinal of the corresponding feature
    bbox: BoundingBox,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.bbox.to_aabb() }
}

type CentroidEntry = GeomWithData<[f64; 2], usize>;

/// Read-only R-tree over the bounding boxes of one feature collection.
///
/// The index is a snapshot: it stores ordinals, not features. Querying it
/// on behalf of a collection other than the one it was built from (or after
/// that collection was replaced) is a caller error and returns meaningless
/// ordinals.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    rtree: RTree<IndexedBox>,
    centroids: RTree<CentroidEntry>,
    source_len: usize,
    bounds: Option<BoundingBox>,
}

impl SpatialIndex {
    /// Index every feature with a finite bounding box. Empty geometries and
    /// geometries with non-finite coordinates are skipped and never returned.
    pub fn build(collection: &FeatureCollection) -> Self {
        let features = collection.features();

        let boxes: Vec<IndexedBox> = features.iter().enumerate()
            .filter_map(|(idx, f)| f.bbox().filter(BoundingBox::is_valid).map(|bbox| IndexedBox { idx, bbox }))
            .collect();

        let centroid_of = |(idx, f): (usize, &crate::feature::Feature)| {
            f.check().ok()
                .and_then(|g| g.centroid().ok())
                .map(|c| CentroidEntry::new([c.x(), c.y()], idx))
        };
        let centroids: Vec<CentroidEntry> = if EngineConfig::default().run_parallel(features.len()) {
            features.par_iter().enumerate().filter_map(centroid_of).collect()
        } else {
            features.iter().enumerate().filter_map(centroid_of).collect()
        };

        let bounds = boxes.iter().map(|b| b.bbox).reduce(|a, b| a.union(&b));
        tracing::debug!(
            features = features.len(),
            indexed = boxes.len(),
            skipped = features.len() - boxes.len(),
            "built spatial index"
        );

        Self {
            rtree: RTree::bulk_load(boxes),
            centroids: RTree::bulk_load(centroids),
            source_len: features.len(),
            bounds,
        }
    }

    /// Number of indexed features.
    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// Number of features in the collection the index was built from.
    #[inline] pub fn source_len(&self) -> usize { self.source_len }

    /// Bounding box of everything indexed.
    #[inline] pub fn bounds(&self) -> Option<BoundingBox> { self.bounds }

    /// Ordinals (ascending) of features whose bounding box intersects `bbox`.
    ///
    /// These are candidates only: a box hit is necessary but not sufficient
    /// for any exact predicate.
    pub fn query(&self, bbox: &BoundingBox) -> Result<Vec<usize>> {
        if !bbox.is_valid() {
            return Err(GeoError::InvalidQuery(format!(
                "query box ({}, {}, {}, {}) must be finite with min <= max",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            )));
        }
        let mut hits: Vec<usize> = self.candidates(bbox).collect();
        hits.sort_unstable();
        Ok(hits)
    }

    /// Ordinals of features whose bounding box contains `point`.
    pub fn query_point(&self, point: Point<f64>) -> Result<Vec<usize>> {
        self.query(&BoundingBox::from_coord(point.0))
    }

    /// The `k` features whose centroids are closest to `point`, as
    /// `(ordinal, distance)` by increasing distance; equal distances are
    /// ordered by ordinal.
    pub fn nearest(&self, point: Point<f64>, k: usize) -> Result<Vec<(usize, f64)>> {
        if !(point.x().is_finite() && point.y().is_finite()) {
            return Err(GeoError::InvalidQuery("nearest query point must be finite".into()));
        }
        if self.centroids.size() == 0 {
            return Err(GeoError::EmptyCollection("nearest"));
        }
        if k == 0 { return Ok(Vec::new()) }

        // The iterator yields non-decreasing distances; keep reading past the
        // k-th hit while it still ties, then order ties by ordinal.
        let mut hits: Vec<(usize, f64)> = Vec::with_capacity(k);
        for (entry, d2) in self.centroids.nearest_neighbor_iter_with_distance_2(&[point.x(), point.y()]) {
            if hits.len() >= k && d2 > hits[k - 1].1 { break }
            hits.push((entry.data, d2));
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);

        Ok(hits.into_iter().map(|(idx, d2)| (idx, d2.sqrt())).collect())
    }

    /// Unchecked candidate lookup used by joins (boxes come from validated features).
    #[inline]
    pub(crate) fn candidates(&self, bbox: &BoundingBox) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(&bbox.to_aabb()).map(|b| b.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Crs, Feature};
    use crate::geom::Geometry;

    fn grid() -> FeatureCollection {
        // 3x3 grid of unit squares, ordinal = row * 3 + col.
        let features = (0..3)
            .flat_map(|row| (0..3).map(move |col| (row, col)))
            .map(|(row, col)| {
                let (x, y) = (col as f64, row as f64);
                Feature::from_geometry(Geometry::rect(x, y, x + 1.0, y + 1.0))
            })
            .collect();
        FeatureCollection::new(Crs::epsg(3857), features)
    }

    #[test]
    fn query_returns_sorted_candidates() {
        let index = SpatialIndex::build(&grid());
        assert_eq!(index.len(), 9);

        let hits = index.query(&BoundingBox::new(0.5, 0.5, 1.5, 0.9)).unwrap();
        assert_eq!(hits, vec![0, 1]);

        // Shared corner touches four cells.
        let corner = index.query_point(Point::new(1.0, 1.0)).unwrap();
        assert_eq!(corner, vec![0, 1, 3, 4]);

        assert!(index.query(&BoundingBox::new(10.0, 10.0, 11.0, 11.0)).unwrap().is_empty());
    }

    #[test]
    fn non_finite_query_is_rejected() {
        let index = SpatialIndex::build(&grid());
        let err = index.query(&BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0)).unwrap_err();
        assert_eq!(err.kind(), "invalid-query");
        assert!(index.query(&BoundingBox::new(2.0, 0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn nearest_breaks_ties_by_ordinal() {
        let index = SpatialIndex::build(&grid());

        // Centre of the grid is the centroid of cell 4.
        let hits = index.nearest(Point::new(1.5, 1.5), 1).unwrap();
        assert_eq!(hits, vec![(4, 0.0)]);

        // Four edge neighbours of cell 4 are equidistant.
        let hits = index.nearest(Point::new(1.5, 1.5), 3).unwrap();
        let ordinals: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ordinals, vec![4, 1, 3]);
        assert!((hits[1].1 - 1.0).abs() < 1e-12);

        assert!(index.nearest(Point::new(0.0, 0.0), 0).unwrap().is_empty());
    }

    #[test]
    fn invalid_and_empty_geometries_are_skipped() {
        let collection = FeatureCollection::new(Crs::epsg(3857), vec![
            Feature::from_geometry(Geometry::empty()),
            Feature::from_geometry(Geometry::point(f64::NAN, 1.0)),
            Feature::from_geometry(Geometry::point(2.0, 2.0)),
        ]);
        let index = SpatialIndex::build(&collection);
        assert_eq!(index.len(), 1);
        assert_eq!(index.source_len(), 3);
        assert_eq!(index.nearest(Point::new(0.0, 0.0), 5).unwrap(), vec![(2, 8f64.sqrt())]);
    }

    #[test]
    fn nearest_on_empty_index_fails() {
        let index = SpatialIndex::build(&FeatureCollection::empty(Crs::epsg(4326)));
        assert_eq!(index.nearest(Point::new(0.0, 0.0), 1).unwrap_err().kind(), "empty-collection");
        assert!(index.is_empty());
    }
}
