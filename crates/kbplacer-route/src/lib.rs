//! Switch-matrix router: row, column and switch-diode tracks between placed
//! footprints.

pub mod collision;
pub mod graph;
mod router;
pub mod track;

pub use graph::{Link, MissingPad, Net, NetId, PadRef, PadSelectors, RoutingGraph};
pub use router::{
    Layer, MatrixRouter, NetConnection, RouterConfig, RoutingOutput, TrackSegment, Unrouted,
    UnroutedReason,
};
pub use track::Posture;
