#![doc = "GeoFrame vector geometry engine: predicates, set operations, spatial index, joins and dissolve"]
mod config;
mod dissolve;
mod error;
mod feature;
mod geom;
mod index;
mod join;
mod proj;

pub mod predicate;

#[doc(inline)]
pub use config::{CancelFlag, EngineConfig};

#[doc(inline)]
pub use error::{GeoError, Result};

#[doc(inline)]
pub use feature::{attributes_from_json, AttrValue, Attributes, Crs, Feature, FeatureCollection};

#[doc(inline)]
pub use geom::{BoundingBox, Geometry, Location};

#[doc(inline)]
pub use index::SpatialIndex;

#[doc(inline)]
pub use predicate::Predicate;

#[doc(inline)]
pub use join::{sjoin, sjoin_with_index, JoinMode, JoinOptions, JoinOutcome, JoinResult, JoinRow, INDEX_RIGHT};

#[doc(inline)]
pub use dissolve::{dissolve, AggFunc, Aggregations, DissolveOptions, DissolveResult, GroupOutcome};

#[doc(inline)]
pub use proj::{Proj4Reprojector, Reproject};

/// Re-exported so callers can build geometries from `geo` types directly.
pub use geo;
