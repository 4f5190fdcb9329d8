//! Footprint placement: turns layout keys into switch, diode and auxiliary
//! footprint positions on the board.

pub mod catalog;
pub mod element;
mod engine;

pub use catalog::{
    mx_pads, sod123_pads, CatalogError, CurrentPlacement, FootprintCatalog, FootprintRef,
    MapCatalog, Pad, StandardCatalog,
};
pub use element::{
    ElementError, ElementInfo, ElementPosition, FootprintRole, PositionOption,
    DEFAULT_DIODE_POSITION, ZERO_POSITION,
};
pub use engine::{
    FailureReason, FootprintPlacement, PlacedFootprint, PlacementConfig, PlacementEngine,
    PlacementError, PlacementFailure, PlacementOutput,
};
