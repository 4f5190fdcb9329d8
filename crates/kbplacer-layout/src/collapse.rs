//! Folding of alternative layouts onto the default one.
//!
//! Layout editors draw every alternative (split backspace, ISO enter, bottom-row
//! variants) away from the main block. Collapsing moves each alternative onto
//! the spot of its default choice so the extra switch footprints land where the
//! keycaps would go.

use std::collections::BTreeMap;

use kbplacer_core::Point;
use tracing::{debug, warn};

use crate::error::ParseWarning;
use crate::model::{round6, Key, Layout, MatrixPosition};

const CENTER_EPSILON: f64 = 1e-6;

fn top_left<'a>(keys: impl Iterator<Item = &'a Key>) -> Option<(f64, f64)> {
    keys.fold(None, |acc, k| match acc {
        None => Some((k.x, k.y)),
        Some((x, y)) => Some((f64::min(x, k.x), f64::min(y, k.y))),
    })
}

fn is_alternative(key: &Key) -> bool {
    key.option.is_some_and(|o| !o.is_default())
}

fn shift(key: &mut Key, dx: f64, dy: f64) {
    key.x = round6(key.x + dx);
    key.y = round6(key.y + dy);
    for r in &mut key.rotations {
        if let Some(p) = r.pivot.as_mut() {
            *p = Point::new(round6(p.x + dx), round6(p.y + dy));
        }
    }
}

pub(crate) fn collapse(layout: &mut Layout, warnings: &mut Vec<ParseWarning>) {
    // layout id -> choice -> member positions in `keys`
    let mut groups: BTreeMap<u32, BTreeMap<u32, Vec<usize>>> = BTreeMap::new();
    for (pos, key) in layout.keys.iter().enumerate() {
        if let Some(option) = key.option {
            groups
                .entry(option.layout)
                .or_default()
                .entry(option.choice)
                .or_default()
                .push(pos);
        }
    }

    for (layout_id, choices) in &groups {
        let Some(default_members) = choices.get(&0) else {
            warn!(layout = layout_id, "alternative layout has no default choice, left in place");
            continue;
        };
        let Some(anchor) = top_left(default_members.iter().map(|&p| &layout.keys[p])) else {
            continue;
        };
        for (choice, members) in choices.iter().filter(|(c, _)| **c != 0) {
            let Some(origin) = top_left(members.iter().map(|&p| &layout.keys[p])) else {
                continue;
            };
            let (dx, dy) = (anchor.0 - origin.0, anchor.1 - origin.1);
            debug!(layout = layout_id, choice, dx, dy, "moving alternative choice");
            for &p in members {
                shift(&mut layout.keys[p], dx, dy);
            }
        }
    }

    layout.keys.retain(|k| !k.decal);

    let defaults: Vec<(MatrixPosition, Point)> = layout
        .keys
        .iter()
        .filter(|k| !is_alternative(k))
        .filter_map(|k| k.matrix.map(|m| (m, k.rotated_center())))
        .collect();
    layout.keys.retain(|k| {
        if !is_alternative(k) {
            return true;
        }
        let Some(matrix) = k.matrix else {
            return true;
        };
        let center = k.rotated_center();
        let duplicate = defaults
            .iter()
            .any(|(m, c)| *m == matrix && c.approx_eq(center, CENTER_EPSILON));
        if duplicate {
            debug!(key = k.index, "alternative key duplicates a default key, removed");
            warnings.push(ParseWarning::DuplicateAlternative { index: k.index });
        }
        !duplicate
    });

    layout.keys.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    layout.alternative_keys = layout
        .keys
        .iter()
        .filter(|k| is_alternative(k))
        .map(|k| k.index)
        .collect();
}
