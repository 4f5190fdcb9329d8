use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use kbplacer_core::{normalize_angle, Point, Transform};

use crate::value::Value;

/// Number of legend slots on a key.
pub const LABEL_SLOTS: usize = 12;
/// Legend slot holding `"row,col"`.
pub const MATRIX_LABEL: usize = 0;
/// Legend slot holding `"layout,choice"` for alternative layouts.
pub const LAYOUT_OPTION_LABEL: usize = 8;
/// Legend slot holding an explicit footprint number.
pub const ANNOTATION_LABEL: usize = 9;

/// A rotation about `pivot`, or about the key's own center when `pivot` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub angle: f64,
    #[serde(default)]
    pub pivot: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatrixPosition {
    pub row: u32,
    pub column: u32,
}

impl MatrixPosition {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// Alternative-layout membership (`layout` group, `choice` within it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutOption {
    pub layout: u32,
    pub choice: u32,
}

impl LayoutOption {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.choice == 0
    }
}

/// Where a key came from in the source description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub row: usize,
    pub cell: usize,
}

/// One physical key.
///
/// `x`/`y` are the unrotated top-left corner in layout units. Rotations are
/// kept separately, innermost first, so that a cluster rotation and the group
/// rotation around it compose without touching the stored position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// Position of the key in the source description.
    pub index: usize,
    #[serde(default)]
    pub source: SourceLocation,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotations: Vec<Rotation>,
    #[serde(default)]
    pub labels: Vec<Option<String>>,
    #[serde(default)]
    pub matrix: Option<MatrixPosition>,
    #[serde(default)]
    pub option: Option<LayoutOption>,
    #[serde(default)]
    pub annotation: Option<u32>,
    #[serde(default)]
    pub decal: bool,
    #[serde(default)]
    pub ghost: bool,
    #[serde(default)]
    pub mirrored: bool,
}

impl Key {
    #[must_use]
    pub fn new(index: usize, x: f64, y: f64) -> Self {
        Self {
            index,
            source: SourceLocation::default(),
            x,
            y,
            width: 1.0,
            height: 1.0,
            rotations: Vec::new(),
            labels: Vec::new(),
            matrix: None,
            option: None,
            annotation: None,
            decal: false,
            ghost: false,
            mirrored: false,
        }
    }

    #[must_use]
    pub fn label(&self, slot: usize) -> Option<&str> {
        self.labels.get(slot).and_then(|l| l.as_deref())
    }

    pub fn set_label(&mut self, slot: usize, text: impl Into<String>) {
        if self.labels.len() <= slot {
            self.labels.resize(slot + 1, None);
        }
        self.labels[slot] = Some(text.into());
    }

    /// Unrotated center in layout units.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Total rotation in degrees, normalized.
    #[must_use]
    pub fn angle(&self) -> f64 {
        normalize_angle(self.rotations.iter().map(|r| r.angle).sum())
    }

    /// Layout-space transform of the key's local frame (origin at the unrotated center).
    ///
    /// `scale` converts layout units to the target unit per axis; pivots are scaled
    /// before rotating so non-square key pitches keep rotated clusters rigid.
    #[must_use]
    pub fn transform(&self, scale: (f64, f64)) -> Transform {
        let center = self.center().scale(scale.0, scale.1);
        let mut t = Transform::translation(center);
        for r in &self.rotations {
            let pivot = match r.pivot {
                Some(p) => p.scale(scale.0, scale.1),
                None => t.offset,
            };
            t = Transform::rotation_about(r.angle, pivot).then_after(&t);
        }
        t
    }

    /// Rotated center in layout units.
    #[must_use]
    pub fn rotated_center(&self) -> Point {
        self.transform((1.0, 1.0)).offset
    }

    /// Keys that exist only as artwork are never placed.
    #[must_use]
    pub fn is_placeable(&self) -> bool {
        !self.decal
    }
}

/// How matrix positions were obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMode {
    /// Every placeable key carried an explicit `row,col` marker or structured field.
    #[default]
    Annotated,
    /// Positions were derived from visual order; routing follows the description
    /// rather than the real matrix.
    Sequential,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl LayoutMeta {
    pub(crate) fn from_map(map: &IndexMap<String, Value>) -> Self {
        let mut meta = LayoutMeta::default();
        for (k, v) in map {
            match k.as_str() {
                "name" => meta.name = v.as_str().map(str::to_string),
                "author" => meta.author = v.as_str().map(str::to_string),
                "notes" => meta.notes = v.as_str().map(str::to_string),
                _ => {
                    meta.extra.insert(k.clone(), v.clone());
                }
            }
        }
        meta
    }
}

/// Normalized keyboard layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub meta: LayoutMeta,
    pub keys: Vec<Key>,
    /// `Key::index` of every non-default alternative-layout key kept by collapsing.
    #[serde(default)]
    pub alternative_keys: Vec<usize>,
    #[serde(default)]
    pub matrix_mode: MatrixMode,
}

impl Layout {
    pub fn placeable_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| k.is_placeable())
    }

    /// Right edge of the non-mirrored keys, the default mirror line.
    #[must_use]
    pub fn right_edge(&self) -> f64 {
        self.keys
            .iter()
            .filter(|k| !k.mirrored)
            .map(|k| k.x + k.width)
            .fold(0.0, f64::max)
    }
}

/// Round to six decimals; layout units never need more and this keeps
/// chained fractional offsets free of binary noise.
#[must_use]
pub fn round6(v: f64) -> f64 {
    let r = (v * 1_000_000.0).round() / 1_000_000.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
