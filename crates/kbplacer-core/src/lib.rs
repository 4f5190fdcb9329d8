//! Geometry shared by the placement engine and the matrix router.

pub mod point;
pub mod transform;

pub use point::{BoardPoint, Point, Side, MAX_BOARD_MM, NM_PER_MM};
pub use transform::{
    compose, mirror_point, normalize_angle, rotate_point, rotate_vec, Axis, Transform,
};
