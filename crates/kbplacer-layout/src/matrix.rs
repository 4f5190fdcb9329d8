//! Matrix annotations carried in key legends.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::error::{LayoutError, ParseWarning};
use crate::model::{
    Key, LayoutOption, MatrixMode, MatrixPosition, ANNOTATION_LABEL, LABEL_SLOTS,
    LAYOUT_OPTION_LABEL, MATRIX_LABEL,
};

fn pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*,\s*(\d+)\s*$").expect("valid regex"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*$").expect("valid regex"))
}

/// Parse a `"a,b"` legend.
#[must_use]
pub fn parse_pair(text: &str) -> Option<(u32, u32)> {
    let caps = pair_re().captures(text)?;
    let a = caps.get(1)?.as_str().parse().ok()?;
    let b = caps.get(2)?.as_str().parse().ok()?;
    Some((a, b))
}

fn matrix_from_labels(key: &Key) -> Option<MatrixPosition> {
    if let Some((row, column)) = key.label(MATRIX_LABEL).and_then(parse_pair) {
        return Some(MatrixPosition::new(row, column));
    }
    (0..LABEL_SLOTS)
        .filter(|slot| *slot != MATRIX_LABEL && *slot != LAYOUT_OPTION_LABEL)
        .find_map(|slot| key.label(slot).and_then(parse_pair))
        .map(|(row, column)| MatrixPosition::new(row, column))
}

/// Fill matrix position, alternative-layout option and explicit annotation from
/// the legends. Fields already set (structured inputs) are left alone.
pub(crate) fn read_annotations(keys: &mut [Key]) {
    for key in keys.iter_mut() {
        if key.option.is_none() {
            key.option = key
                .label(LAYOUT_OPTION_LABEL)
                .and_then(parse_pair)
                .map(|(layout, choice)| LayoutOption { layout, choice });
        }
        if key.annotation.is_none() {
            key.annotation = key
                .label(ANNOTATION_LABEL)
                .and_then(|l| number_re().captures(l))
                .and_then(|c| c.get(1)?.as_str().parse().ok());
        }
        if key.matrix.is_none() && key.is_placeable() {
            key.matrix = matrix_from_labels(key);
        }
    }
}

/// Make sure every placeable key has a matrix position, applying the
/// sequential fallback when allowed.
pub(crate) fn resolve_positions(
    keys: &mut [Key],
    sequential_fallback: bool,
    warnings: &mut Vec<ParseWarning>,
) -> Result<MatrixMode, LayoutError> {
    let missing = keys.iter().find(|k| k.is_placeable() && k.matrix.is_none());
    let Some(first) = missing else {
        return Ok(MatrixMode::Annotated);
    };
    if !sequential_fallback {
        return Err(LayoutError::MissingMatrixPosition {
            index: first.index,
            row: first.source.row,
            cell: first.source.cell,
        });
    }

    let mut source_rows: Vec<usize> = keys
        .iter()
        .filter(|k| k.is_placeable())
        .map(|k| k.source.row)
        .collect();
    source_rows.sort_unstable();
    source_rows.dedup();

    let mut columns: HashMap<usize, u32> = HashMap::new();
    let mut assigned = 0;
    for key in keys.iter_mut().filter(|k| k.is_placeable()) {
        let row = source_rows
            .binary_search(&key.source.row)
            .map_err(|_| LayoutError::Internal("source row vanished".into()))?;
        let column = columns.entry(row).or_insert(0);
        key.matrix = Some(MatrixPosition::new(row as u32, *column));
        *column += 1;
        assigned += 1;
    }
    warn!(
        keys = assigned,
        "matrix positions missing, assigned from visual order; routing will not match the real matrix"
    );
    warnings.push(ParseWarning::SequentialMatrix { keys: assigned });
    Ok(MatrixMode::Sequential)
}

/// Reject two placeable keys sharing a matrix position within the same layout option.
pub(crate) fn check_unique(keys: &[Key]) -> Result<(), LayoutError> {
    let mut seen: HashMap<(MatrixPosition, Option<LayoutOption>), usize> = HashMap::new();
    for key in keys.iter().filter(|k| k.is_placeable()) {
        let Some(pos) = key.matrix else { continue };
        // a default choice is always populated, like a key without options
        let option = key.option.filter(|o| !o.is_default());
        if let Some(first) = seen.insert((pos, option), key.index) {
            return Err(LayoutError::DuplicateMatrixPosition {
                row: pos.row,
                column: pos.column,
                first,
                second: key.index,
            });
        }
    }
    Ok(())
}

/// Bounds check against a declared matrix size.
pub(crate) fn check_bounds(keys: &[Key], rows: u32, cols: u32) -> Result<(), LayoutError> {
    for key in keys {
        let Some(pos) = key.matrix else { continue };
        if pos.row >= rows || pos.column >= cols {
            return Err(LayoutError::MatrixOutOfRange {
                index: key.index,
                row: pos.row,
                column: pos.column,
                rows,
                cols,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceLocation;

    fn key(index: usize, row: usize, legend: &[(usize, &str)]) -> Key {
        let mut k = Key::new(index, index as f64, row as f64);
        k.source = SourceLocation { row, cell: index };
        for (slot, text) in legend {
            k.set_label(*slot, *text);
        }
        k
    }

    #[test]
    fn pair_accepts_whitespace() {
        assert_eq!(parse_pair(" 3 , 12 "), Some((3, 12)));
        assert_eq!(parse_pair("3;12"), None);
        assert_eq!(parse_pair("-1,2"), None);
    }

    #[test]
    fn matrix_falls_back_to_other_slots_but_not_option_slot() {
        let mut keys = vec![
            key(0, 0, &[(0, "Esc"), (6, "0,1")]),
            key(1, 0, &[(8, "1,0")]),
            key(2, 0, &[(0, "2,3"), (8, "1,1"), (9, "7")]),
        ];
        read_annotations(&mut keys);
        assert_eq!(keys[0].matrix, Some(MatrixPosition::new(0, 1)));
        assert_eq!(keys[1].matrix, None);
        assert_eq!(keys[1].option, Some(LayoutOption { layout: 1, choice: 0 }));
        assert_eq!(keys[2].matrix, Some(MatrixPosition::new(2, 3)));
        assert_eq!(keys[2].annotation, Some(7));
    }

    #[test]
    fn missing_position_names_the_key() {
        let mut keys = vec![key(0, 0, &[(0, "0,0")]), key(1, 0, &[(0, "A")])];
        read_annotations(&mut keys);
        let err = resolve_positions(&mut keys, false, &mut Vec::new()).unwrap_err();
        match err {
            LayoutError::MissingMatrixPosition { index, row, cell } => {
                assert_eq!((index, row, cell), (1, 0, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decals_do_not_need_positions() {
        let mut keys = vec![key(0, 0, &[(0, "0,0")]), key(1, 0, &[])];
        keys[1].decal = true;
        read_annotations(&mut keys);
        let mode = resolve_positions(&mut keys, false, &mut Vec::new()).unwrap();
        assert_eq!(mode, MatrixMode::Annotated);
        assert_eq!(keys[1].matrix, None);
    }

    #[test]
    fn sequential_fallback_uses_visual_order() {
        let mut keys = vec![
            key(0, 1, &[]),
            key(1, 1, &[]),
            key(2, 3, &[]),
            key(3, 3, &[(0, "5,5")]),
        ];
        let mut warnings = Vec::new();
        read_annotations(&mut keys);
        let mode = resolve_positions(&mut keys, true, &mut warnings).unwrap();
        assert_eq!(mode, MatrixMode::Sequential);
        let positions: Vec<_> = keys.iter().map(|k| k.matrix.unwrap()).collect();
        assert_eq!(
            positions,
            vec![
                MatrixPosition::new(0, 0),
                MatrixPosition::new(0, 1),
                MatrixPosition::new(1, 0),
                MatrixPosition::new(1, 1),
            ]
        );
        assert_eq!(warnings, vec![ParseWarning::SequentialMatrix { keys: 4 }]);
    }

    #[test]
    fn duplicates_are_allowed_only_across_options() {
        let mut keys = vec![
            key(0, 0, &[(0, "0,0"), (8, "0,0")]),
            key(1, 0, &[(0, "0,0"), (8, "0,1")]),
        ];
        read_annotations(&mut keys);
        assert!(check_unique(&keys).is_ok());

        keys.push(key(2, 0, &[(0, "0,0"), (8, "0,1")]));
        read_annotations(&mut keys);
        match check_unique(&keys).unwrap_err() {
            LayoutError::DuplicateMatrixPosition { first, second, .. } => {
                assert_eq!((first, second), (1, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn default_choice_clashes_with_a_plain_key() {
        let mut keys = vec![key(0, 0, &[(0, "0,0")]), key(1, 0, &[(0, "0,0"), (8, "0,0")])];
        read_annotations(&mut keys);
        match check_unique(&keys).unwrap_err() {
            LayoutError::DuplicateMatrixPosition { first, second, .. } => {
                assert_eq!((first, second), (0, 1));
            }
            other => panic!("unexpected {other:?}"),
        }

        keys[1] = key(1, 0, &[(0, "0,0"), (8, "0,1")]);
        read_annotations(&mut keys);
        assert!(check_unique(&keys).is_ok());
    }

    #[test]
    fn bounds_are_checked() {
        let mut keys = vec![key(0, 0, &[(0, "1,4")])];
        read_annotations(&mut keys);
        assert!(check_bounds(&keys, 2, 5).is_ok());
        assert!(matches!(
            check_bounds(&keys, 2, 4),
            Err(LayoutError::MatrixOutOfRange { column: 4, .. })
        ));
    }
}
