//! Ergogen `points` output: named points in millimetres, y up, angles
//! counter-clockwise.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::LayoutError;
use crate::model::{round6, Key, LayoutMeta, MatrixPosition, Rotation, SourceLocation, MATRIX_LABEL};
use crate::value::Value;

pub(crate) fn is_ergogen(doc: &Value) -> bool {
    let Value::Map(points) = doc else {
        return false;
    };
    !points.is_empty()
        && points.values().all(|p| {
            p.get("x").and_then(Value::as_f64).is_some()
                && p.get("y").and_then(Value::as_f64).is_some()
        })
}

fn name_of(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Map(m) => m.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn trailing_number(net: &str) -> Option<u32> {
    let digits: String = net
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

#[derive(Default)]
struct Ordinals(IndexMap<String, u32>);

impl Ordinals {
    fn of(&mut self, name: String) -> u32 {
        let next = self.0.len() as u32;
        *self.0.entry(name).or_insert(next)
    }
}

pub(crate) fn parse_ergogen(doc: &Value, unit: f64) -> Result<(LayoutMeta, Vec<Key>), LayoutError> {
    let Value::Map(points) = doc else {
        return Err(LayoutError::UnknownFormat("ergogen points must be a map".into()));
    };
    if points.is_empty() {
        return Err(LayoutError::Empty);
    }
    if unit <= 0.0 {
        return Err(LayoutError::Internal(format!("invalid key unit {unit}")));
    }

    let mut rows = Ordinals::default();
    let mut columns = Ordinals::default();
    let mut keys = Vec::with_capacity(points.len());

    for (index, (name, point)) in points.iter().enumerate() {
        let coord = |field: &str| {
            point.get(field).and_then(Value::as_f64).ok_or_else(|| {
                LayoutError::parse(0, index, format!("point \"{name}\" has no numeric \"{field}\""))
            })
        };
        let (x, y) = (coord("x")?, coord("y")?);
        let r = point.get("r").and_then(Value::as_f64).unwrap_or(0.0);
        let meta = point.get("meta");
        let size = |field: &str| {
            meta.and_then(|m| m.get(field))
                .and_then(Value::as_f64)
                .map_or(1.0, |mm| mm / unit)
        };
        let (width, height) = (size("width"), size("height"));

        let center = (x / unit, -y / unit);
        let mut key = Key::new(index, center.0 - width / 2.0, center.1 - height / 2.0);
        key.width = width;
        key.height = height;
        if r != 0.0 {
            key.rotations.push(Rotation {
                angle: -r,
                pivot: None,
            });
        }

        let net = |field: &str| {
            meta.and_then(|m| m.get(field))
                .and_then(Value::as_str)
                .and_then(trailing_number)
        };
        let row = net("row_net").or_else(|| {
            name_of(meta.and_then(|m| m.get("row"))).map(|n| rows.of(n))
        });
        let column = net("column_net").or_else(|| {
            let col = name_of(meta.and_then(|m| m.get("col")))?;
            let zone = name_of(meta.and_then(|m| m.get("zone"))).unwrap_or_default();
            Some(columns.of(format!("{zone}/{col}")))
        });
        key.source = SourceLocation {
            row: row.unwrap_or(0) as usize,
            cell: index,
        };
        if let (Some(row), Some(column)) = (row, column) {
            key.matrix = Some(MatrixPosition::new(row, column));
            key.set_label(MATRIX_LABEL, format!("{row},{column}"));
        }
        debug!(point = %name, matrix = ?key.matrix, "converted ergogen point");
        keys.push(key);
    }

    let (min_x, min_y) = keys.iter().fold((f64::INFINITY, f64::INFINITY), |(mx, my), k| {
        (mx.min(k.x), my.min(k.y))
    });
    for key in &mut keys {
        key.x = round6(key.x - min_x);
        key.y = round6(key.y - min_y);
    }

    Ok((LayoutMeta::default(), keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn trailing_digits_are_read() {
        assert_eq!(trailing_number("ROW12"), Some(12));
        assert_eq!(trailing_number("C0"), Some(0));
        assert_eq!(trailing_number("GND"), None);
    }

    #[test]
    fn points_flip_y_and_rotation() {
        let doc = Value::from_yaml_str(
            r"
matrix_pinky_bottom:
  x: 0
  y: 0
  r: 0
  meta: {row: bottom, col: {name: pinky}, zone: {name: matrix}}
matrix_pinky_top:
  x: 0
  y: 19.05
  r: 15
  meta: {row: top, col: {name: pinky}, zone: {name: matrix}}
",
        )
        .unwrap();
        assert!(is_ergogen(&doc));
        let (_, keys) = parse_ergogen(&doc, 19.05).unwrap();
        assert_eq!(keys.len(), 2);
        // top row is above the bottom row once y points down
        assert_abs_diff_eq!(keys[1].y, 0.0);
        assert_abs_diff_eq!(keys[0].y, 1.0);
        assert_abs_diff_eq!(keys[1].angle(), -15.0);
        assert_eq!(keys[0].matrix, Some(MatrixPosition::new(0, 0)));
        assert_eq!(keys[1].matrix, Some(MatrixPosition::new(1, 0)));
        assert_eq!(keys[1].label(MATRIX_LABEL), Some("1,0"));
    }

    #[test]
    fn explicit_nets_win_over_names() {
        let doc = Value::from_yaml_str(
            "a: {x: 0, y: 0, meta: {row: home, row_net: R3, column_net: C7, col: x}}\n",
        )
        .unwrap();
        let (_, keys) = parse_ergogen(&doc, 19.05).unwrap();
        assert_eq!(keys[0].matrix, Some(MatrixPosition::new(3, 7)));
    }
}
