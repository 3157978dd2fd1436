// Integration tests for dissolve:
//   grouping by region with summed population, per-column aggregations,
//   first-occurrence ordering, and idempotence.

use anyhow::Result;
use geoframe::predicate::equals;
use geoframe::{dissolve, AggFunc, Aggregations, AttrValue, Crs, DissolveOptions, Feature, FeatureCollection, Geometry};

/// Five unit squares: three in a row in the west, two stacked in the east.
fn counties() -> FeatureCollection {
    let county = |x: f64, y: f64, region: &str, name: &str, population: f64| {
        Feature::new(
            Geometry::rect(x, y, x + 1.0, y + 1.0),
            [
                ("region", AttrValue::from(region)),
                ("name", AttrValue::from(name)),
                ("population", AttrValue::from(population)),
            ],
        )
    };
    FeatureCollection::new(Crs::epsg(3310), vec![
        county(0.0, 0.0, "west", "Alpine", 1_200.0),
        county(10.0, 0.0, "east", "Butte", 211_000.0),
        county(1.0, 0.0, "west", "Colusa", 21_500.0),
        county(10.0, 1.0, "east", "Del Norte", 27_800.0),
        county(2.0, 0.0, "west", "El Dorado", 191_000.0),
    ])
}

#[test]
fn regions_sum_population_and_union_geometry() -> Result<()> {
    let result = dissolve(&counties(), "region", &AggFunc::Sum.into(), &DissolveOptions::default());
    // Summing the "name" strings is a type error for every group.
    let result = result?;
    assert_eq!(result.errors().count(), 2);

    let columns = Aggregations::Columns(vec![("population".to_string(), AggFunc::Sum)]);
    let regions = dissolve(&counties(), "region", &columns, &DissolveOptions::default())?.into_collection();

    assert_eq!(regions.len(), 2);
    assert_eq!(regions.column("region"), vec![AttrValue::from("west"), AttrValue::from("east")]);
    assert_eq!(regions.column("population"), vec![AttrValue::Number(213_700.0), AttrValue::Number(238_800.0)]);
    assert!(regions.get(0).and_then(|f| f.get("name")).is_none());

    let west = regions.get(0).map(Feature::geometry).cloned().unwrap_or_else(Geometry::empty);
    assert!(equals(&west, &Geometry::rect(0.0, 0.0, 3.0, 1.0))?);
    let east = regions.get(1).map(Feature::geometry).cloned().unwrap_or_else(Geometry::empty);
    assert!((east.area()? - 2.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn first_and_last_follow_input_order() -> Result<()> {
    let columns = Aggregations::Columns(vec![
        ("name".to_string(), AggFunc::First),
        ("population".to_string(), AggFunc::Max),
    ]);
    let regions = dissolve(&counties(), "region", &columns, &DissolveOptions::default())?.into_collection();
    assert_eq!(regions.column("name"), vec![AttrValue::from("Alpine"), AttrValue::from("Butte")]);
    assert_eq!(regions.column("population"), vec![AttrValue::Number(191_000.0), AttrValue::Number(211_000.0)]);

    let last = Aggregations::Columns(vec![("name".to_string(), AggFunc::Last)]);
    let regions = dissolve(&counties(), "region", &last, &DissolveOptions::default())?.into_collection();
    assert_eq!(regions.column("name"), vec![AttrValue::from("El Dorado"), AttrValue::from("Del Norte")]);
    Ok(())
}

#[test]
fn group_members_are_reported() -> Result<()> {
    let result = dissolve(&counties(), "region", &Aggregations::default(), &DissolveOptions::default())?;
    let members: Vec<Vec<usize>> = result.groups().iter().map(|g| g.members.clone()).collect();
    assert_eq!(members, vec![vec![0, 2, 4], vec![1, 3]]);
    Ok(())
}

#[test]
fn dissolving_twice_changes_nothing() -> Result<()> {
    let columns = Aggregations::Columns(vec![("population".to_string(), AggFunc::Sum)]);
    let once = dissolve(&counties(), "region", &columns, &DissolveOptions::default())?.into_collection();
    let twice = dissolve(&once, "region", &columns, &DissolveOptions::default())?.into_collection();
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn parallel_and_sequential_dissolve_agree() -> Result<()> {
    // Many small groups so the work crosses the parallel threshold.
    let features: Vec<Feature> = (0..300)
        .map(|i| {
            let x = (i % 30) as f64;
            let y = (i / 30) as f64;
            Feature::new(Geometry::rect(x, y, x + 1.0, y + 1.0), [("tile", ((i % 30) / 3) as f64 + (i / 30) as f64 * 10.0)])
        })
        .collect();
    let collection = FeatureCollection::new(Crs::epsg(3857), features);

    let parallel = dissolve(&collection, "tile", &AggFunc::Count.into(), &DissolveOptions::default())?;
    let sequential = dissolve(&collection, "tile", &AggFunc::Count.into(), &DissolveOptions::default().parallel(false))?;
    assert_eq!(parallel.groups().len(), 100);
    assert_eq!(parallel.collection(), sequential.collection());
    Ok(())
}

#[test]
fn pinched_union_survives_a_second_dissolve() -> Result<()> {
    // 3x3 block without the centre and top-right cells: the merged outline
    // touches itself at (2, 2).
    let cells: Vec<Feature> = (0..3)
        .flat_map(|x| (0..3).map(move |y| (x, y)))
        .filter(|&cell| cell != (1, 1) && cell != (2, 2))
        .map(|(x, y)| Feature::new(Geometry::rect(x as f64, y as f64, x as f64 + 1.0, y as f64 + 1.0), [("block", "x")]))
        .collect();
    let collection = FeatureCollection::new(Crs::epsg(3857), cells);

    let once = dissolve(&collection, "block", &Aggregations::default(), &DissolveOptions::default())?;
    assert_eq!(once.errors().count(), 0);
    let merged = once.collection();
    let block = merged.get(0).map(Feature::geometry).cloned().unwrap_or_else(Geometry::empty);
    assert!(block.is_valid(), "{:?}", block.validate());
    assert!((block.area()? - 7.0).abs() < 1e-9);

    let twice = dissolve(&merged, "block", &Aggregations::default(), &DissolveOptions::default())?;
    assert_eq!(twice.errors().count(), 0);
    assert_eq!(twice.collection(), merged);
    Ok(())
}
