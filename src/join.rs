use ahash::AHashSet;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::config::{CancelFlag, EngineConfig};
use crate::error::{GeoError, Result};
use crate::feature::{AttrValue, Attributes, Crs, Feature, FeatureCollection};
use crate::index::SpatialIndex;
use crate::predicate::Predicate;

/// Name of the attribute holding the matched right ordinal.
pub const INDEX_RIGHT: &str = "index_right";

/// Which left features produce rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// One row per matching (left, right) pair.
    #[default]
    Inner,
    /// Like `Inner`, plus one row with null right attributes for every left
    /// feature without a match.
    Left,
}

/// Settings for [`sjoin`].
#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub predicate: Predicate,
    pub mode: JoinMode,
    /// Appended as `_<lsuffix>` to left attributes whose name also exists on the right.
    pub lsuffix: String,
    /// Appended as `_<rsuffix>` to right attributes whose name also exists on the left.
    pub rsuffix: String,
    /// Add an [`INDEX_RIGHT`] attribute with the matched right ordinal.
    pub index_right: bool,
    /// Spread left features over the thread pool for large inputs.
    pub parallel: bool,
    pub cancel: CancelFlag,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            predicate: Predicate::default(),
            mode: JoinMode::default(),
            lsuffix: "left".to_string(),
            rsuffix: "right".to_string(),
            index_right: true,
            parallel: true,
            cancel: CancelFlag::default(),
        }
    }
}

impl JoinOptions {
    pub fn predicate(mut self, predicate: Predicate) -> Self { self.predicate = predicate; self }

    pub fn mode(mut self, mode: JoinMode) -> Self { self.mode = mode; self }

    pub fn suffixes(mut self, lsuffix: impl Into<String>, rsuffix: impl Into<String>) -> Self {
        self.lsuffix = lsuffix.into();
        self.rsuffix = rsuffix.into();
        self
    }

    pub fn index_right(mut self, index_right: bool) -> Self { self.index_right = index_right; self }

    pub fn parallel(mut self, parallel: bool) -> Self { self.parallel = parallel; self }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self { self.cancel = cancel; self }
}

/// One output row: the left geometry with merged attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRow {
    /// Matched right ordinal; `None` for an unmatched row in left mode.
    pub right: Option<usize>,
    pub feature: Feature,
}

/// Everything one left feature produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub left: usize,
    pub rows: Result<Vec<JoinRow>>,
}

/// Result of a spatial join: per-left outcomes in left ordinal order.
#[derive(Debug, Clone)]
pub struct JoinResult {
    crs: Crs,
    outcomes: Vec<JoinOutcome>,
}

impl JoinResult {
    #[inline] pub fn outcomes(&self) -> &[JoinOutcome] { &self.outcomes }

    /// Left ordinals that failed, with the reason.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &GeoError)> + '_ {
        self.outcomes.iter().filter_map(|o| o.rows.as_ref().err().map(|e| (o.left, e)))
    }

    /// Successful rows.
    pub fn rows(&self) -> impl Iterator<Item = &JoinRow> + '_ {
        self.outcomes.iter().filter_map(|o| o.rows.as_ref().ok()).flatten()
    }

    /// `(left, right)` ordinal of every successful row.
    pub fn pairs(&self) -> Vec<(usize, Option<usize>)> {
        self.outcomes.iter()
            .filter_map(|o| o.rows.as_ref().ok().map(|rows| (o.left, rows)))
            .flat_map(|(left, rows)| rows.iter().map(move |row| (left, row.right)))
            .collect()
    }

    /// Successful rows as a collection in the left CRS.
    pub fn collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.crs.clone(), self.rows().map(|row| row.feature.clone()).collect())
    }

    pub fn into_collection(self) -> FeatureCollection {
        let features = self.outcomes.into_iter()
            .filter_map(|o| o.rows.ok())
            .flatten()
            .map(|row| row.feature)
            .collect();
        FeatureCollection::new(self.crs, features)
    }
}

/// Join `left` against `right` by `options.predicate`, attaching right
/// attributes to left geometries.
///
/// The CRS tags must match. Invalid geometries fail only the left feature
/// they affect; raising the cancel flag fails the whole call.
pub fn sjoin(left: &FeatureCollection, right: &FeatureCollection, options: &JoinOptions) -> Result<JoinResult> {
    left.ensure_same_crs(right)?;
    let index = right.sindex();
    sjoin_with_index(left, right, &index, options)
}

/// [`sjoin`] with a pre-built index over `right`. The index must have been
/// built from `right` itself.
pub fn sjoin_with_index(
    left: &FeatureCollection,
    right: &FeatureCollection,
    index: &SpatialIndex,
    options: &JoinOptions,
) -> Result<JoinResult> {
    left.ensure_same_crs(right)?;
    let _span = tracing::debug_span!("sjoin", predicate = %options.predicate, left = left.len(), right = right.len()).entered();

    let schema = Schema::new(left, right, options)?;
    let join_one = |(ordinal, feature): (usize, &Feature)| -> Result<JoinOutcome> {
        options.cancel.check()?;
        Ok(JoinOutcome { left: ordinal, rows: join_feature(feature, right, index, &schema, options) })
    };

    let outcomes = if options.parallel && EngineConfig::default().run_parallel(left.len()) {
        left.features().par_iter().enumerate().map(join_one).collect::<Result<Vec<_>>>()?
    } else {
        left.features().iter().enumerate().map(join_one).collect::<Result<Vec<_>>>()?
    };

    let result = JoinResult { crs: left.crs().clone(), outcomes };
    tracing::debug!(rows = result.rows().count(), errors = result.errors().count(), "spatial join finished");
    Ok(result)
}

/// Matches and rows for a single left feature.
fn join_feature(
    feature: &Feature,
    right: &FeatureCollection,
    index: &SpatialIndex,
    schema: &Schema,
    options: &JoinOptions,
) -> Result<Vec<JoinRow>> {
    let geometry = feature.check()?;

    let mut candidates: SmallVec<[usize; 8]> = if options.predicate.needs_overlap() {
        feature.bbox().map(|bbox| index.candidates(&bbox).collect()).unwrap_or_default()
    } else {
        (0..right.len()).collect()
    };
    candidates.sort_unstable();

    let mut matches: SmallVec<[usize; 4]> = SmallVec::new();
    for j in candidates {
        let Some(other) = right.get(j) else { continue };
        let other_geometry = other.check()
            .map_err(|e| GeoError::invalid(format!("right feature {j}: {e}")))?;
        if options.predicate.evaluate_unchecked(geometry, other_geometry) {
            matches.push(j);
        }
    }

    if matches.is_empty() {
        return Ok(match options.mode {
            JoinMode::Inner => Vec::new(),
            JoinMode::Left => vec![JoinRow { right: None, feature: schema.row(feature, None, options) }],
        });
    }
    Ok(matches.into_iter()
        .filter_map(|j| right.get(j).map(|other| JoinRow { right: Some(j), feature: schema.row(feature, Some((j, other)), options) }))
        .collect())
}

/// Attribute names present on each side, used to resolve collisions the
/// same way for every row.
struct Schema {
    left: AHashSet<String>,
    right: AHashSet<String>,
}

impl Schema {
    fn new(left: &FeatureCollection, right: &FeatureCollection, options: &JoinOptions) -> Result<Self> {
        let names = |c: &FeatureCollection| -> AHashSet<String> {
            c.iter().flat_map(|f| f.attributes().keys().cloned()).collect()
        };
        let schema = Self { left: names(left), right: names(right) };

        if options.index_right && (schema.left.contains(INDEX_RIGHT) || schema.right.contains(INDEX_RIGHT)) {
            return Err(GeoError::attribute(INDEX_RIGHT, "name is reserved for the matched right ordinal"));
        }
        if options.lsuffix == options.rsuffix && !schema.left.is_disjoint(&schema.right) {
            return Err(GeoError::attribute(&options.lsuffix, "left and right suffixes must differ"));
        }

        let mut output = AHashSet::with_capacity(schema.left.len() + schema.right.len() + 1);
        if options.index_right {
            output.insert(INDEX_RIGHT.to_string());
        }
        let renamed_left = schema.left.iter().map(|name| schema.left_name(name, options));
        let renamed_right = schema.right.iter().map(|name| schema.right_name(name, options));
        for name in renamed_left.chain(renamed_right) {
            if !output.insert(name.clone()) {
                return Err(GeoError::attribute(&name, "suffixed name collides with an existing attribute"));
            }
        }
        Ok(schema)
    }

    fn left_name(&self, name: &str, options: &JoinOptions) -> String {
        if self.right.contains(name) { format!("{name}_{}", options.lsuffix) } else { name.to_string() }
    }

    fn right_name(&self, name: &str, options: &JoinOptions) -> String {
        if self.left.contains(name) { format!("{name}_{}", options.rsuffix) } else { name.to_string() }
    }

    fn row(&self, feature: &Feature, matched: Option<(usize, &Feature)>, options: &JoinOptions) -> Feature {
        let mut attributes = Attributes::new();

        for (name, value) in feature.attributes() {
            attributes.insert(self.left_name(name, options), value.clone());
        }

        let rename = |name: &String| self.right_name(name, options);
        match matched {
            Some((_, other)) => {
                for name in &self.right {
                    attributes.insert(rename(name), other.get(name).cloned().unwrap_or_default());
                }
            }
            None => {
                for name in &self.right {
                    attributes.insert(rename(name), AttrValue::Null);
                }
            }
        }

        if options.index_right {
            let value = matched.map_or(AttrValue::Null, |(j, _)| AttrValue::Number(j as f64));
            attributes.insert(INDEX_RIGHT.to_string(), value);
        }

        Feature::from_parts(feature.geometry().clone(), attributes)
    }
}
