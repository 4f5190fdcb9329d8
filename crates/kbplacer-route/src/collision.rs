//! Exact segment tests on the nanometre grid.
//!
//! Orientation predicates are evaluated in `i128`, so there is no rounding
//! anywhere in the overlap test. Only the optional clearance check falls back
//! to floating point distances.

use kbplacer_core::BoardPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub start: BoardPoint,
    pub end: BoardPoint,
}

impl Segment {
    #[must_use]
    pub const fn new(start: BoardPoint, end: BoardPoint) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn shared_endpoint(&self, other: &Segment) -> Option<BoardPoint> {
        [self.start, self.end]
            .into_iter()
            .find(|p| *p == other.start || *p == other.end)
    }

    fn other_end(&self, p: BoardPoint) -> BoardPoint {
        if self.start == p {
            self.end
        } else {
            self.start
        }
    }
}

fn cross(o: BoardPoint, a: BoardPoint, b: BoardPoint) -> i128 {
    let (ax, ay) = (i128::from(a.x - o.x), i128::from(a.y - o.y));
    let (bx, by) = (i128::from(b.x - o.x), i128::from(b.y - o.y));
    ax * by - ay * bx
}

fn dot(o: BoardPoint, a: BoardPoint, b: BoardPoint) -> i128 {
    let (ax, ay) = (i128::from(a.x - o.x), i128::from(a.y - o.y));
    let (bx, by) = (i128::from(b.x - o.x), i128::from(b.y - o.y));
    ax * bx + ay * by
}

/// `p` is collinear with `s` and inside its bounding box.
fn on_segment(s: &Segment, p: BoardPoint) -> bool {
    cross(s.start, s.end, p) == 0
        && p.x >= s.start.x.min(s.end.x)
        && p.x <= s.start.x.max(s.end.x)
        && p.y >= s.start.y.min(s.end.y)
        && p.y <= s.start.y.max(s.end.y)
}

/// Whether the segments have any point in common.
#[must_use]
pub fn touches(a: &Segment, b: &Segment) -> bool {
    let d1 = cross(b.start, b.end, a.start).signum();
    let d2 = cross(b.start, b.end, a.end).signum();
    let d3 = cross(a.start, a.end, b.start).signum();
    let d4 = cross(a.start, a.end, b.end).signum();
    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }
    on_segment(b, a.start) || on_segment(b, a.end) || on_segment(a, b.start) || on_segment(a, b.end)
}

/// Overlap test that tolerates a shared endpoint: segments meeting end to
/// end only collide when they run along each other from that point.
#[must_use]
pub fn intersects(a: &Segment, b: &Segment) -> bool {
    match a.shared_endpoint(b) {
        Some(p) => {
            let (qa, qb) = (a.other_end(p), b.other_end(p));
            cross(p, qa, qb) == 0 && dot(p, qa, qb) > 0
        }
        None => touches(a, b),
    }
}

fn point_distance(p: BoardPoint, s: &Segment) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (s.start.x as f64, s.start.y as f64);
    let (dx, dy) = (s.end.x as f64 - ax, s.end.y as f64 - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    (px - (ax + t * dx)).hypot(py - (ay + t * dy))
}

/// Shortest distance between two segments, in nanometres.
#[must_use]
pub fn distance(a: &Segment, b: &Segment) -> f64 {
    if touches(a, b) {
        return 0.0;
    }
    [
        point_distance(a.start, b),
        point_distance(a.end, b),
        point_distance(b.start, a),
        point_distance(b.end, a),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
}

/// Collision between segments of different nets on one layer. With a
/// positive clearance, segments closer than it also collide unless they
/// meet at an endpoint.
#[must_use]
pub fn collide(a: &Segment, b: &Segment, clearance_nm: i64) -> bool {
    if intersects(a, b) {
        return true;
    }
    clearance_nm > 0 && a.shared_endpoint(b).is_none() && distance(a, b) < clearance_nm as f64
}
