use std::cmp::Ordering;

use querychart::shape::{compare_axis_values, FieldClasses};
use querychart::{shape, shape_with_hints, ChartDataConfig, ChartKind, ShapeHints};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Map, Value};

const KINDS: [ChartKind; 4] = [ChartKind::Line, ChartKind::Bar, ChartKind::Pie, ChartKind::Area];

/// Random rows over a fixed column set; cells are sometimes null, missing, or a
/// numeric string.
fn random_rows(rng: &mut StdRng, n: usize) -> Vec<Value> {
    let cats = ["north", "south", "east", "west"];
    (0..n)
        .map(|_| {
            let mut m = Map::new();
            m.insert("date".into(), json!(format!("2024-{:02}-{:02}", rng.gen_range(1..=12), rng.gen_range(1..=28))));
            if rng.gen_bool(0.9) {
                m.insert("region".into(), json!(cats[rng.gen_range(0..cats.len())]));
            }
            let v = match rng.gen_range(0..4) {
                0 => Value::Null,
                1 => json!(rng.gen_range(0..100).to_string()),
                _ => json!(rng.gen_range(0..100)),
            };
            m.insert("sales".into(), v);
            m.insert("units".into(), json!(rng.gen_range(0..10)));
            Value::Object(m)
        })
        .collect()
}

fn assert_well_formed(cfg: &ChartDataConfig) {
    for row in &cfg.data {
        assert!(row.contains_key(&cfg.x_axis_key), "row {:?} lacks x '{}'", row, cfg.x_axis_key);
        for key in cfg.data_keys.series() {
            let cell = row.get(key).unwrap_or(&Value::Null);
            assert!(!cell.is_null(), "series '{}' null in {:?}", key, row);
        }
    }
}

#[test]
fn random_inputs_shape_deterministically_and_completely() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for round in 0..50 {
        let n = rng.gen_range(1..40);
        let rows = random_rows(&mut rng, n);
        for kind in KINDS {
            let a = shape(&rows, kind);
            let b = shape(&rows, kind);
            assert_eq!(a, b, "round {} kind {}", round, kind);
            assert_well_formed(&a);
        }
    }
}

#[test]
fn line_and_area_are_ordered_by_x() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..30 {
        let rows = random_rows(&mut rng, 25);
        for kind in [ChartKind::Line, ChartKind::Area] {
            let cfg = shape(&rows, kind);
            for pair in cfg.data.windows(2) {
                let (x0, x1) = (&pair[0][&cfg.x_axis_key], &pair[1][&cfg.x_axis_key]);
                assert_ne!(compare_axis_values(x0, x1), Ordering::Greater, "{} after {}", x0, x1);
            }
        }
    }
}

#[test]
fn wide_rows_keep_their_count() {
    // a single categorical column never pivots
    let mut rng = StdRng::seed_from_u64(7);
    let rows: Vec<Value> = (0..30).map(|i| json!({"day": format!("d{}", i), "a": rng.gen_range(0..9), "b": 1})).collect();
    let sample = match &rows[0] {
        Value::Object(m) => m.clone(),
        _ => unreachable!(),
    };
    assert_eq!(FieldClasses::of(&sample).categorical.len(), 1);
    for kind in KINDS {
        assert_eq!(shape(&rows, kind).data.len(), rows.len());
    }
}

#[test]
fn long_rows_pivot_to_one_row_per_x() {
    let rows = vec![
        json!({"month": "Jan", "type": "A", "count": 5}),
        json!({"month": "Jan", "type": "B", "count": 3}),
        json!({"month": "Feb", "type": "A", "count": 7}),
    ];
    let cfg = shape(&rows, ChartKind::Line);
    let expected = json!({
        "data": [{"month": "Jan", "A": 5, "B": 3}, {"month": "Feb", "A": 7, "B": 0}],
        "dataKeys": {"primary": "A", "secondary": "B"},
        "xAxisKey": "month"
    });
    assert_eq!(serde_json::to_value(&cfg).unwrap(), expected);
}

#[test]
fn pie_and_bar_degenerate_examples() {
    let pie = shape(&[json!({"category": "Enterprise", "value": 45}), json!({"category": "SMB", "value": 30})], ChartKind::Pie);
    assert_eq!(
        serde_json::to_value(&pie.data).unwrap(),
        json!([{"name": "Enterprise", "value": 45}, {"name": "SMB", "value": 30}])
    );

    let bar = shape(&[json!({"institute": "X"}), json!({"institute": "X"}), json!({"institute": "Y"})], ChartKind::Bar);
    assert_eq!(serde_json::to_value(&bar.data).unwrap(), json!([{"name": "X", "value": 2}, {"name": "Y", "value": 1}]));
}

#[test]
fn empty_input_is_never_an_error() {
    for kind in KINDS {
        assert_eq!(shape(&[], kind), ChartDataConfig::default());
        assert_eq!(shape_with_hints(&[], kind, &ShapeHints { x_axis_key: Some("t".into()), ..Default::default() }), ChartDataConfig::default());
    }
}
