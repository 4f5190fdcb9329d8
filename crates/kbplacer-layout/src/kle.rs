use indexmap::IndexMap;
use kbplacer_core::Point;
use tracing::warn;

use crate::error::{LayoutError, ParseWarning};
use crate::groups::{ClusterState, RotationStaging};
use crate::model::{round6, Key, LayoutMeta, SourceLocation, LABEL_SLOTS};
use crate::value::Value;

/// Legend line -> label slot, per alignment flag (`a`). `-1` means the
/// alignment has no slot for that line.
const LABEL_MAP: [[i8; LABEL_SLOTS]; 8] = [
    [0, 6, 2, 8, 9, 11, 3, 5, 1, 4, 7, 10],
    [1, 7, -1, -1, 9, 11, 4, -1, -1, -1, -1, 10],
    [3, -1, 5, -1, 9, 11, -1, -1, 4, -1, -1, 10],
    [4, -1, -1, -1, 9, 11, -1, -1, -1, -1, -1, 10],
    [0, 6, 2, 8, 10, -1, 3, 5, 1, 4, 7, -1],
    [1, 7, -1, -1, 10, -1, 4, -1, -1, -1, -1, -1],
    [3, -1, 5, -1, 10, -1, -1, -1, 4, -1, -1, -1],
    [4, -1, -1, -1, 10, -1, -1, -1, -1, -1, -1, -1],
];

const DEFAULT_ALIGN: usize = 4;

/// Modifier state threaded through the rows.
///
/// The cursor (`x`, `y`) returns to the cluster origin at every row start while
/// rotation, pivot, alignment and mirroring carry over until changed.
#[derive(Debug, Clone)]
struct State {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    rx: f64,
    ry: f64,
    r: f64,
    align: usize,
    decal: bool,
    ghost: bool,
    mirrored: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
            rx: 0.0,
            ry: 0.0,
            r: 0.0,
            align: DEFAULT_ALIGN,
            decal: false,
            ghost: false,
            mirrored: false,
        }
    }
}

impl State {
    fn cluster(&self) -> ClusterState {
        ClusterState {
            angle: self.r,
            pivot: Point::new(self.rx, self.ry),
        }
    }
}

pub(crate) struct KleOutput {
    pub meta: LayoutMeta,
    pub keys: Vec<Key>,
}

fn number(
    props: &IndexMap<String, Value>,
    key: &str,
    loc: (usize, usize),
) -> Result<Option<f64>, LayoutError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            LayoutError::parse(loc.0, loc.1, format!("\"{key}\" must be a finite number"))
        }),
    }
}

fn flag(props: &IndexMap<String, Value>, key: &str) -> Option<bool> {
    props.get(key).and_then(|v| match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(*n != 0.0),
        _ => None,
    })
}

pub(crate) fn parse_kle(
    doc: &Value,
    warnings: &mut Vec<ParseWarning>,
) -> Result<KleOutput, LayoutError> {
    let Value::Seq(rows) = doc else {
        return Err(LayoutError::parse(0, 0, "KLE document must be an array of rows"));
    };
    if rows.is_empty() {
        return Err(LayoutError::Empty);
    }

    let mut meta = LayoutMeta::default();
    let mut state = State::default();
    let mut staging = RotationStaging::default();
    let mut keys: Vec<Key> = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        match row {
            Value::Map(m) if row_idx == 0 => meta = LayoutMeta::from_map(m),
            Value::Seq(cells) => {
                parse_row(row_idx, cells, &mut state, &mut staging, &mut keys, warnings)?;
                state.y = round6(state.y + 1.0);
                state.x = state.rx;
            }
            Value::Map(_) => {
                return Err(LayoutError::parse(
                    row_idx,
                    0,
                    "metadata object is only allowed as the first row",
                ));
            }
            _ => {
                return Err(LayoutError::parse(row_idx, 0, "KLE rows must be arrays"));
            }
        }
    }

    staging.close_all(&mut keys);
    if keys.is_empty() {
        return Err(LayoutError::Empty);
    }
    Ok(KleOutput { meta, keys })
}

fn parse_row(
    row_idx: usize,
    cells: &[Value],
    state: &mut State,
    staging: &mut RotationStaging,
    keys: &mut Vec<Key>,
    warnings: &mut Vec<ParseWarning>,
) -> Result<(), LayoutError> {
    for (cell_idx, cell) in cells.iter().enumerate() {
        let loc = (row_idx, cell_idx);
        match cell {
            Value::Map(props) => apply_modifier(props, loc, state, staging, keys)?,
            Value::String(legend) => {
                let index = keys.len();
                let mut key = Key::new(index, round6(state.x), round6(state.y));
                key.source = SourceLocation {
                    row: row_idx,
                    cell: cell_idx,
                };
                key.width = state.w;
                key.height = state.h;
                key.labels = reorder_labels(legend, state.align, index, warnings);
                key.decal = state.decal;
                key.ghost = state.ghost;
                key.mirrored = state.mirrored;
                keys.push(key);
                staging.stage(index, state.cluster(), keys);

                state.x = round6(state.x + state.w);
                state.w = 1.0;
                state.h = 1.0;
                state.decal = false;
            }
            Value::Null => {}
            _ => {
                return Err(LayoutError::parse(
                    row_idx,
                    cell_idx,
                    "row items must be objects or strings",
                ));
            }
        }
    }
    Ok(())
}

fn apply_modifier(
    props: &IndexMap<String, Value>,
    loc: (usize, usize),
    state: &mut State,
    staging: &mut RotationStaging,
    keys: &mut [Key],
) -> Result<(), LayoutError> {
    let r = number(props, "r", loc)?;
    let rx = number(props, "rx", loc)?;
    let ry = number(props, "ry", loc)?;
    if loc.1 != 0 && (r.is_some() || rx.is_some() || ry.is_some()) {
        return Err(LayoutError::parse(
            loc.0,
            loc.1,
            "rotation can only be specified on the first key in a row",
        ));
    }
    if let Some(r) = r {
        state.r = r;
    }
    if let Some(rx) = rx {
        state.rx = rx;
        state.x = rx;
        state.y = state.ry;
    }
    if let Some(ry) = ry {
        state.ry = ry;
        state.x = state.rx;
        state.y = ry;
    }

    if let Some(a) = number(props, "a", loc)? {
        let a = a as usize;
        if a >= LABEL_MAP.len() {
            return Err(LayoutError::parse(loc.0, loc.1, format!("invalid label alignment {a}")));
        }
        state.align = a;
    }
    if let Some(dx) = number(props, "x", loc)? {
        state.x = round6(state.x + dx);
    }
    if let Some(dy) = number(props, "y", loc)? {
        state.y = round6(state.y + dy);
    }
    if let Some(w) = number(props, "w", loc)? {
        state.w = w;
    }
    if let Some(h) = number(props, "h", loc)? {
        state.h = h;
    }
    if let Some(d) = flag(props, "d") {
        state.decal = d;
    }
    if let Some(g) = flag(props, "g") {
        state.ghost = g;
    }
    if let Some(m) = flag(props, "mirror") {
        state.mirrored = m;
    }

    match props.get("group") {
        None => {}
        Some(Value::Null) => {
            if !staging.close_named(keys) {
                return Err(LayoutError::parse(loc.0, loc.1, "no rotation group to close"));
            }
        }
        Some(Value::String(name)) if !name.is_empty() => {
            staging.open_named(name, Point::new(state.rx, state.ry));
        }
        Some(Value::String(_)) => {
            if !staging.close_named(keys) {
                return Err(LayoutError::parse(loc.0, loc.1, "no rotation group to close"));
            }
        }
        Some(_) => {
            return Err(LayoutError::parse(loc.0, loc.1, "\"group\" must be a string or null"));
        }
    }

    let gr = number(props, "gr", loc)?;
    let grx = number(props, "grx", loc)?;
    let gry = number(props, "gry", loc)?;
    if (gr.is_some() || grx.is_some() || gry.is_some()) && !staging.update_named(gr, grx, gry) {
        return Err(LayoutError::parse(
            loc.0,
            loc.1,
            "group rotation given outside of an open rotation group",
        ));
    }

    Ok(())
}

fn reorder_labels(
    legend: &str,
    align: usize,
    index: usize,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<Option<String>> {
    let mut lines: Vec<&str> = legend.split('\n').collect();
    if lines.len() > LABEL_SLOTS {
        warn!(
            key = index,
            count = lines.len(),
            "legend has more than {LABEL_SLOTS} lines, ignoring the rest"
        );
        warnings.push(ParseWarning::TooManyLabels {
            index,
            count: lines.len(),
        });
        lines.truncate(LABEL_SLOTS);
    }

    let mut labels: Vec<Option<String>> = vec![None; LABEL_SLOTS];
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let slot = LABEL_MAP[align][i];
        if slot < 0 {
            warn!(key = index, line = i, align, "label alignment has no slot for legend line");
            warnings.push(ParseWarning::LabelDropped {
                index,
                line: i,
                align,
            });
            continue;
        }
        labels[slot as usize] = Some((*line).to_string());
    }
    while matches!(labels.last(), Some(None)) {
        labels.pop();
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kle(json: serde_json::Value) -> Result<(KleOutput, Vec<ParseWarning>), LayoutError> {
        let mut warnings = Vec::new();
        let out = parse_kle(&Value::from_json_value(&json), &mut warnings)?;
        Ok((out, warnings))
    }

    fn labels(json: serde_json::Value) -> Vec<Option<String>> {
        kle(json).unwrap().0.keys[0].labels.clone()
    }

    fn slot(n: usize) -> Vec<Option<String>> {
        let mut v = vec![None; n];
        v.push(Some("x".to_string()));
        v
    }

    #[test]
    fn labels_follow_alignment_table() {
        assert_eq!(labels(serde_json::json!([["x"]])), slot(0));
        assert_eq!(labels(serde_json::json!([[{"a": 5}, "x"]])), slot(1));
        assert_eq!(labels(serde_json::json!([["\n\nx"]])), slot(2));
        assert_eq!(labels(serde_json::json!([[{"a": 6}, "x"]])), slot(3));
        assert_eq!(labels(serde_json::json!([[{"a": 7}, "x"]])), slot(4));
        assert_eq!(labels(serde_json::json!([[{"a": 6}, "\n\nx"]])), slot(5));
        assert_eq!(labels(serde_json::json!([["\nx"]])), slot(6));
        assert_eq!(labels(serde_json::json!([[{"a": 5}, "\nx"]])), slot(7));
        assert_eq!(labels(serde_json::json!([["\n\n\nx"]])), slot(8));
        assert_eq!(labels(serde_json::json!([[{"a": 3}, "\n\n\n\nx"]])), slot(9));
        assert_eq!(labels(serde_json::json!([[{"a": 7}, "\n\n\n\nx"]])), slot(10));
        assert_eq!(labels(serde_json::json!([[{"a": 3}, "\n\n\n\n\nx"]])), slot(11));
        let all = vec!["x"; 12].join("\n");
        assert_eq!(
            labels(serde_json::json!([[{"a": 0}, all]])),
            vec![Some("x".to_string()); 12]
        );
    }

    #[test]
    fn too_many_labels_are_truncated_with_warning() {
        let legend = vec!["x"; 13].join("\n");
        let (out, warnings) = kle(serde_json::json!([[{"a": 0}, legend]])).unwrap();
        assert_eq!(out.keys[0].labels, vec![Some("x".to_string()); 12]);
        assert_eq!(
            warnings,
            vec![ParseWarning::TooManyLabels { index: 0, count: 13 }]
        );
    }

    #[test]
    fn fractional_offsets_do_not_accumulate_noise() {
        let doc = serde_json::json!([
            [{"r": 10, "rx": 1, "y": -0.1, "x": 2}, "E"],
            [{"y": -0.65, "x": 1}, "W", {"x": 1}, "R"],
            [{"y": -0.75}, "Q"],
            [{"y": -0.9, "x": 4}, "T"],
            [{"y": -0.7, "x": 2}, "D"],
            [{"y": -0.65, "x": 1}, "S", {"x": 1}, "F"]
        ]);
        let (out, _) = kle(doc).unwrap();
        let positions: Vec<(f64, f64)> = out.keys.iter().map(|k| (k.x, k.y)).collect();
        assert_eq!(
            positions,
            vec![
                (3.0, -0.1),
                (2.0, 0.25),
                (4.0, 0.25),
                (1.0, 0.5),
                (5.0, 0.6),
                (3.0, 0.9),
                (2.0, 1.25),
                (4.0, 1.25),
            ]
        );
        assert!(out.keys.iter().all(|k| k.angle() == 10.0));
    }

    #[test]
    fn rotation_is_rejected_mid_row() {
        let err = kle(serde_json::json!([["0", {"r": 15, "rx": 1, "ry": 2}, "1"]]))
            .err()
            .unwrap();
        match err {
            LayoutError::Parse { row, cell, .. } => assert_eq!((row, cell), (0, 1)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_documents_are_rejected() {
        for doc in [
            serde_json::json!([]),
            serde_json::json!({}),
            serde_json::json!(""),
            serde_json::json!("[[\"x\"]]"),
            serde_json::json!(["", ""]),
            serde_json::json!([{}, {}]),
            serde_json::json!([[], {}]),
        ] {
            assert!(kle(doc.clone()).is_err(), "{doc} should fail");
        }
    }

    #[test]
    fn metadata_row_is_read() {
        let (out, _) =
            kle(serde_json::json!([{"name": "tiny", "backcolor": "#eee"}, ["x"]])).unwrap();
        assert_eq!(out.meta.name.as_deref(), Some("tiny"));
        assert_eq!(
            out.meta.extra.get("backcolor"),
            Some(&Value::String("#eee".to_string()))
        );
        assert_eq!(out.keys[0].source, SourceLocation { row: 1, cell: 0 });
    }

    #[test]
    fn cursor_resets_per_row_but_rotation_persists() {
        let doc = serde_json::json!([
            [{"r": 30, "rx": 2, "ry": 1}, "a", {"w": 1.5}, "b"],
            ["c"]
        ]);
        let (out, _) = kle(doc).unwrap();
        let k = &out.keys;
        assert_eq!((k[0].x, k[0].y), (2.0, 1.0));
        assert_eq!((k[1].x, k[1].y, k[1].width), (3.0, 1.0, 1.5));
        assert_eq!((k[2].x, k[2].y, k[2].width), (2.0, 2.0, 1.0));
        for key in k {
            assert_eq!(key.rotations.len(), 1);
            assert_eq!(key.rotations[0].angle, 30.0);
            assert_eq!(key.rotations[0].pivot, Some(Point::new(2.0, 1.0)));
        }
    }

    #[test]
    fn decal_resets_after_one_key_but_ghost_and_mirror_persist() {
        let doc = serde_json::json!([
            [{"d": true, "g": true, "mirror": true}, "a", "b"],
            ["c"]
        ]);
        let (out, _) = kle(doc).unwrap();
        let flags: Vec<(bool, bool, bool)> = out
            .keys
            .iter()
            .map(|k| (k.decal, k.ghost, k.mirrored))
            .collect();
        assert_eq!(
            flags,
            vec![(true, true, true), (false, true, true), (false, true, true)]
        );
    }

    #[test]
    fn named_group_rotates_members_retroactively() {
        let doc = serde_json::json!([
            [{"group": "thumb"}, "a", "b"],
            [{"gr": 20, "grx": 0, "gry": 1}, "c", {"group": null}, "d"]
        ]);
        let (out, _) = kle(doc).unwrap();
        for key in &out.keys[..3] {
            assert_eq!(key.rotations.len(), 1);
            assert_eq!(key.rotations[0].angle, 20.0);
            assert_eq!(key.rotations[0].pivot, Some(Point::new(0.0, 1.0)));
        }
        assert!(out.keys[3].rotations.is_empty());
    }

    #[test]
    fn named_group_without_pivot_turns_as_one_block() {
        let doc = serde_json::json!([[{"rx": 1, "ry": 2, "group": "g", "gr": 90}, "a", "b"]]);
        let (out, _) = kle(doc).unwrap();
        let (a, b) = (&out.keys[0], &out.keys[1]);
        assert_eq!(a.rotations[0].pivot, Some(Point::new(1.0, 2.0)));
        assert_eq!(b.rotations[0].pivot, Some(Point::new(1.0, 2.0)));

        // side by side before the turn, stacked after it
        let (ca, cb) = (a.rotated_center(), b.rotated_center());
        assert!((ca.x - cb.x).abs() < 1e-9);
        assert!(((cb.y - ca.y).abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn group_rotation_needs_open_group() {
        assert!(kle(serde_json::json!([[{"gr": 5}, "a"]])).is_err());
        assert!(kle(serde_json::json!([[{"group": null}, "a"]])).is_err());
    }
}
