use kbplacer_layout::{parse_layout, ParseOptions, Value};
use kbplacer_place::{PlacementConfig, PlacementEngine, StandardCatalog};
use kbplacer_route::collision::intersects;
use kbplacer_route::{MatrixRouter, RouterConfig};
use proptest::prelude::*;
use serde_json::json;

/// KLE rows with per-row stagger, random widths and an optional cluster rotation.
fn keyboard(rows: &[(u8, Vec<bool>)], angle: i32) -> serde_json::Value {
    let mut doc = Vec::new();
    for (r, (stagger, wide)) in rows.iter().enumerate() {
        let mut row = Vec::new();
        for (c, w) in wide.iter().enumerate() {
            let mut modifiers = serde_json::Map::new();
            if c == 0 {
                if r == 0 && angle != 0 {
                    modifiers.insert("r".into(), json!(angle));
                    modifiers.insert("rx".into(), json!(0));
                    modifiers.insert("ry".into(), json!(0));
                }
                modifiers.insert("x".into(), json!(f64::from(*stagger) * 0.125));
            }
            if *w {
                modifiers.insert("w".into(), json!(1.5));
            }
            if !modifiers.is_empty() {
                row.push(serde_json::Value::Object(modifiers));
            }
            row.push(json!(format!("{r},{c}")));
        }
        doc.push(serde_json::Value::Array(row));
    }
    serde_json::Value::Array(doc)
}

fn rows() -> impl Strategy<Value = Vec<(u8, Vec<bool>)>> {
    prop::collection::vec((0u8..4, prop::collection::vec(any::<bool>(), 1..6)), 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn routed_tracks_of_different_nets_never_overlap(
        rows in rows(),
        angle in -30i32..=30,
        clearance in prop_oneof![Just(0.0f64), Just(0.2f64)],
    ) {
        let document = Value::from_json_value(&keyboard(&rows, angle));
        let layout = parse_layout(&document, &ParseOptions::default())
            .unwrap()
            .layout;
        let placements = PlacementEngine::new(PlacementConfig::default())
            .place(&layout, &StandardCatalog::default())
            .unwrap()
            .placements;
        let config = RouterConfig { clearance_mm: clearance, ..RouterConfig::default() };
        let out = MatrixRouter::new(config).route(&placements);

        let segments: Vec<_> = out
            .connections
            .iter()
            .flat_map(|c| c.segments.iter().map(move |s| (c.net, *s)))
            .collect();
        for (i, (net_a, a)) in segments.iter().enumerate() {
            for (net_b, b) in &segments[i + 1..] {
                if net_a == net_b || a.layer != b.layer {
                    continue;
                }
                prop_assert!(
                    !intersects(&a.geometry(), &b.geometry()),
                    "{net_a} {a:?} overlaps {net_b} {b:?}"
                );
            }
        }
    }
}
