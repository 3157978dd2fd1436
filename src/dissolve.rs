use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;

use crate::config::{CancelFlag, EngineConfig};
use crate::error::{GeoError, Result};
use crate::feature::{AttrValue, Attributes, Crs, Feature, FeatureCollection};
use crate::predicate::unary_union_unchecked;

/// How the values of one attribute are combined within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggFunc {
    /// First non-null value.
    #[default]
    First,
    /// Last non-null value.
    Last,
    Min,
    Max,
    Sum,
    Mean,
    Median,
    /// Number of non-null values.
    Count,
}

impl AggFunc {
    pub const ALL: [AggFunc; 8] = [
        AggFunc::First,
        AggFunc::Last,
        AggFunc::Min,
        AggFunc::Max,
        AggFunc::Sum,
        AggFunc::Mean,
        AggFunc::Median,
        AggFunc::Count,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::First => "first",
            AggFunc::Last => "last",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Count => "count",
        }
    }

    /// Combine the values of `column` over one group. Nulls are ignored by
    /// every function.
    pub fn apply(&self, column: &str, values: &[&AttrValue]) -> Result<AttrValue> {
        let mut present = values.iter().copied().filter(|v| !v.is_null());
        match self {
            AggFunc::First => Ok(present.next().cloned().unwrap_or_default()),
            AggFunc::Last => Ok(present.last().cloned().unwrap_or_default()),
            AggFunc::Count => Ok(AttrValue::Number(present.count() as f64)),
            AggFunc::Min => extreme(column, present, Ordering::Less),
            AggFunc::Max => extreme(column, present, Ordering::Greater),
            AggFunc::Sum => Ok(AttrValue::Number(numbers(column, present, "sum")?.iter().sum())),
            AggFunc::Mean => {
                let numbers = numbers(column, present, "mean")?;
                if numbers.is_empty() { return Ok(AttrValue::Null) }
                Ok(AttrValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
            }
            AggFunc::Median => {
                let mut numbers = numbers(column, present, "median")?;
                if numbers.is_empty() { return Ok(AttrValue::Null) }
                numbers.sort_by(f64::total_cmp);
                let mid = numbers.len() / 2;
                let median = if numbers.len() % 2 == 0 { (numbers[mid - 1] + numbers[mid]) / 2.0 } else { numbers[mid] };
                Ok(AttrValue::Number(median))
            }
        }
    }
}

/// Smallest (`Less`) or largest (`Greater`) value; every value must be of the same kind.
fn extreme<'a>(column: &str, mut values: impl Iterator<Item = &'a AttrValue>, want: Ordering) -> Result<AttrValue> {
    let Some(mut best) = values.next() else { return Ok(AttrValue::Null) };
    for value in values {
        match value.compare(best) {
            Some(order) if order == want => best = value,
            Some(_) => {}
            None => {
                return Err(GeoError::attribute(
                    column,
                    format!("cannot compare {} with {}", value.type_name(), best.type_name()),
                ));
            }
        }
    }
    Ok(best.clone())
}

fn numbers<'a>(column: &str, values: impl Iterator<Item = &'a AttrValue>, func: &str) -> Result<Vec<f64>> {
    values
        .map(|v| v.as_f64().ok_or_else(|| GeoError::attribute(column, format!("{func} needs numbers, found {}", v.type_name()))))
        .collect()
}

impl FromStr for AggFunc {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        AggFunc::ALL.into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| GeoError::InvalidQuery(format!("unknown aggregation {s:?}")))
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Which attributes a dissolve keeps and how.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregations {
    /// One function for every attribute except the key.
    All(AggFunc),
    /// Only the named attributes, each with its own function.
    Columns(Vec<(String, AggFunc)>),
}

impl Default for Aggregations {
    fn default() -> Self { Aggregations::All(AggFunc::First) }
}

impl From<AggFunc> for Aggregations {
    fn from(func: AggFunc) -> Self { Aggregations::All(func) }
}

/// Settings for [`dissolve`].
#[derive(Debug, Clone)]
pub struct DissolveOptions {
    /// Drop features whose key is null (or missing).
    pub dropna: bool,
    pub parallel: bool,
    pub cancel: CancelFlag,
}

impl Default for DissolveOptions {
    fn default() -> Self {
        Self { dropna: true, parallel: true, cancel: CancelFlag::default() }
    }
}

impl DissolveOptions {
    pub fn dropna(mut self, dropna: bool) -> Self { self.dropna = dropna; self }

    pub fn parallel(mut self, parallel: bool) -> Self { self.parallel = parallel; self }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self { self.cancel = cancel; self }
}

/// One group of a dissolve.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub key: AttrValue,
    /// Ordinals of the input features in this group, ascending.
    pub members: Vec<usize>,
    pub feature: Result<Feature>,
}

/// Groups in order of first occurrence of their key.
#[derive(Debug, Clone)]
pub struct DissolveResult {
    crs: Crs,
    groups: Vec<GroupOutcome>,
}

impl DissolveResult {
    #[inline] pub fn groups(&self) -> &[GroupOutcome] { &self.groups }

    /// Keys of the groups that failed, with the reason.
    pub fn errors(&self) -> impl Iterator<Item = (&AttrValue, &GeoError)> + '_ {
        self.groups.iter().filter_map(|g| g.feature.as_ref().err().map(|e| (&g.key, e)))
    }

    /// Successful groups as a collection.
    pub fn collection(&self) -> FeatureCollection {
        let features = self.groups.iter().filter_map(|g| g.feature.as_ref().ok().cloned()).collect();
        FeatureCollection::new(self.crs.clone(), features)
    }

    pub fn into_collection(self) -> FeatureCollection {
        let features = self.groups.into_iter().filter_map(|g| g.feature.ok()).collect();
        FeatureCollection::new(self.crs, features)
    }
}

/// Hashable form of a key value. Numbers hash by bit pattern with `-0.0`
/// folded into `0.0`; attribute values are never NaN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Bool(bool),
    Number(u64),
    String(String),
}

impl From<&AttrValue> for GroupKey {
    fn from(value: &AttrValue) -> Self {
        match value {
            AttrValue::Null => GroupKey::Null,
            AttrValue::Bool(b) => GroupKey::Bool(*b),
            AttrValue::Number(v) => GroupKey::Number(if *v == 0.0 { 0f64.to_bits() } else { v.to_bits() }),
            AttrValue::String(s) => GroupKey::String(s.clone()),
        }
    }
}

/// Group features by the value of `by`, union each group's geometries and
/// combine the other attributes.
///
/// A group whose members all have invalid geometries fails on its own; the
/// other groups are unaffected. A group with a single valid geometry keeps it
/// as is, so dissolving a dissolved collection again changes nothing.
pub fn dissolve(
    collection: &FeatureCollection,
    by: &str,
    aggregations: &Aggregations,
    options: &DissolveOptions,
) -> Result<DissolveResult> {
    if collection.is_empty() {
        return Err(GeoError::EmptyCollection("dissolve"));
    }
    if !collection.iter().any(|f| f.get(by).is_some()) {
        return Err(GeoError::attribute(by, "no feature carries the group key"));
    }
    let _span = tracing::debug_span!("dissolve", by, features = collection.len()).entered();

    let columns = resolve_columns(collection, by, aggregations)?;
    let groups = partition(collection, by, options.dropna);

    let dissolve_one = |(key, members): (AttrValue, Vec<usize>)| -> Result<GroupOutcome> {
        options.cancel.check()?;
        let feature = dissolve_group(collection, by, &key, &members, &columns);
        Ok(GroupOutcome { key, members, feature })
    };
    let groups = if options.parallel && EngineConfig::default().run_parallel(groups.len()) {
        groups.into_par_iter().map(dissolve_one).collect::<Result<Vec<_>>>()?
    } else {
        groups.into_iter().map(dissolve_one).collect::<Result<Vec<_>>>()?
    };

    let result = DissolveResult { crs: collection.crs().clone(), groups };
    tracing::debug!(groups = result.groups.len(), errors = result.errors().count(), "dissolve finished");
    Ok(result)
}

/// Columns to aggregate, in output order.
fn resolve_columns(collection: &FeatureCollection, by: &str, aggregations: &Aggregations) -> Result<Vec<(String, AggFunc)>> {
    match aggregations {
        Aggregations::All(func) => {
            let mut seen = AHashSet::new();
            let mut columns = Vec::new();
            for name in collection.iter().flat_map(|f| f.attributes().keys()) {
                if name != by && seen.insert(name.as_str()) {
                    columns.push((name.clone(), *func));
                }
            }
            Ok(columns)
        }
        Aggregations::Columns(columns) => {
            for (name, _) in columns {
                if name == by {
                    return Err(GeoError::attribute(name, "the group key cannot be aggregated"));
                }
                if !collection.iter().any(|f| f.get(name).is_some()) {
                    return Err(GeoError::attribute(name, "no such attribute"));
                }
            }
            Ok(columns.clone())
        }
    }
}

/// Member ordinals per key, in order of first occurrence.
fn partition(collection: &FeatureCollection, by: &str, dropna: bool) -> Vec<(AttrValue, Vec<usize>)> {
    let mut slots: AHashMap<GroupKey, usize> = AHashMap::new();
    let mut groups: Vec<(AttrValue, Vec<usize>)> = Vec::new();

    for (ordinal, feature) in collection.iter().enumerate() {
        let key = feature.get(by).cloned().unwrap_or_default();
        if dropna && key.is_null() { continue }

        let slot = *slots.entry(GroupKey::from(&key)).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(ordinal);
    }
    groups
}

fn dissolve_group(
    collection: &FeatureCollection,
    by: &str,
    key: &AttrValue,
    members: &[usize],
    columns: &[(String, AggFunc)],
) -> Result<Feature> {
    let features: Vec<&Feature> = members.iter().filter_map(|&i| collection.get(i)).collect();

    let mut geometries = Vec::with_capacity(features.len());
    for (&ordinal, feature) in members.iter().zip(&features) {
        match feature.check() {
            Ok(geometry) => geometries.push(geometry.clone()),
            Err(e) => tracing::warn!(key = %key, ordinal, error = %e, "skipping invalid geometry in dissolve group"),
        }
    }
    if geometries.is_empty() {
        return Err(GeoError::invalid(format!("group {key} has no valid geometry")));
    }
    let geometry = unary_union_unchecked(&geometries)?;

    let mut attributes = Attributes::new();
    attributes.insert(by.to_string(), key.clone());
    for (name, func) in columns {
        let values: Vec<&AttrValue> = features.iter()
            .map(|f| f.get(name).unwrap_or(&AttrValue::Null))
            .collect();
        attributes.insert(name.clone(), func.apply(name, &values)?);
    }

    Ok(Feature::from_parts(geometry, attributes))
}
