//! Track shapes: one 45 degree run plus one axis-aligned run.

use kbplacer_core::BoardPoint;
use serde::Serialize;

/// Which end of a two-segment track carries the 45 degree run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    DiagonalFirst,
    DiagonalLast,
}

impl Posture {
    pub const ALL: [Posture; 2] = [Posture::DiagonalFirst, Posture::DiagonalLast];

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::DiagonalFirst => Self::DiagonalLast,
            Self::DiagonalLast => Self::DiagonalFirst,
        }
    }
}

/// Bend point between `start` and `end`, or `None` when a single straight
/// segment already is axis-aligned or exactly diagonal.
///
/// The diagonal run is as long as the smaller axis delta, the orthogonal run
/// covers what remains of the larger one.
#[must_use]
pub fn corner(start: BoardPoint, end: BoardPoint, posture: Posture) -> Option<BoardPoint> {
    let (dx, dy) = (end.x - start.x, end.y - start.y);
    if dx == 0 || dy == 0 || dx.abs() == dy.abs() {
        return None;
    }
    let d = dx.abs().min(dy.abs());
    let diagonal = BoardPoint::new(dx.signum() * d, dy.signum() * d);
    Some(match posture {
        Posture::DiagonalFirst => start + diagonal,
        Posture::DiagonalLast => end - diagonal,
    })
}

#[must_use]
pub fn track_points(start: BoardPoint, end: BoardPoint, posture: Posture) -> Vec<BoardPoint> {
    match corner(start, end, posture) {
        Some(c) => vec![start, c, end],
        None => vec![start, end],
    }
}
