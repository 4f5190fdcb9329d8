use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::transform::rotate_point;

/// Board coordinates are integer nanometres.
pub const NM_PER_MM: f64 = 1_000_000.0;

/// Largest board coordinate magnitude, in millimetres.
pub const MAX_BOARD_MM: f64 = 1_000_000.0;
const MAX_BOARD_NM: i64 = 1_000_000_000_000;

/// Point in millimetres or layout units, depending on the stage that owns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn shift(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Per-axis scale, used to turn layout units into millimetres.
    #[must_use]
    pub fn scale(self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }

    /// Rotate by `angle_deg` around `pivot`.
    #[must_use]
    pub fn rotate(self, angle_deg: f64, pivot: Point) -> Self {
        rotate_point(self, angle_deg, pivot)
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Round millimetres to the nearest nanometre.
    #[must_use]
    pub fn to_board(self) -> BoardPoint {
        BoardPoint::from_mm(self.x, self.y)
    }

    #[must_use]
    pub fn approx_eq(self, other: Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Fixed-point board location in nanometres.
///
/// Rotations are evaluated in floating point and rounded once, so chained
/// placements never accumulate error below the nanometre grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BoardPoint {
    pub x: i64,
    pub y: i64,
}

impl BoardPoint {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn from_mm(x: f64, y: f64) -> Self {
        Self {
            x: (x * NM_PER_MM).round() as i64,
            y: (y * NM_PER_MM).round() as i64,
        }
    }

    /// Like [`BoardPoint::from_mm`], but `None` for non-finite input or
    /// coordinates beyond [`MAX_BOARD_MM`].
    #[must_use]
    pub fn try_from_mm(x: f64, y: f64) -> Option<Self> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let p = Self::from_mm(x, y);
        p.in_range().then_some(p)
    }

    #[must_use]
    pub fn in_range(self) -> bool {
        self.x.abs() <= MAX_BOARD_NM && self.y.abs() <= MAX_BOARD_NM
    }

    /// Sum that stays within the board coordinate range.
    #[must_use]
    pub fn checked_add(self, rhs: BoardPoint) -> Option<Self> {
        let p = Self::new(self.x.checked_add(rhs.x)?, self.y.checked_add(rhs.y)?);
        p.in_range().then_some(p)
    }

    #[must_use]
    pub fn to_mm(self) -> Point {
        Point::new(self.x as f64 / NM_PER_MM, self.y as f64 / NM_PER_MM)
    }

    /// Rotate an offset given in nanometres and round back onto the grid.
    #[must_use]
    pub fn rotated(self, angle_deg: f64) -> Self {
        let v = crate::transform::rotate_vec(Point::new(self.x as f64, self.y as f64), angle_deg);
        Self::new(v.x.round() as i64, v.y.round() as i64)
    }
}

impl Add for BoardPoint {
    type Output = BoardPoint;
    fn add(self, rhs: BoardPoint) -> BoardPoint {
        BoardPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for BoardPoint {
    type Output = BoardPoint;
    fn sub(self, rhs: BoardPoint) -> BoardPoint {
        BoardPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for BoardPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mm = self.to_mm();
        write!(f, "({:.6}, {:.6})", mm.x, mm.y)
    }
}

/// Board side a footprint sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    #[must_use]
    pub fn is_back(self) -> bool {
        matches!(self, Side::Back)
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FRONT" => Ok(Side::Front),
            "BACK" => Ok(Side::Back),
            other => Err(format!("unknown side \"{other}\", expected FRONT or BACK")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => f.write_str("FRONT"),
            Side::Back => f.write_str("BACK"),
        }
    }
}
