//! The serializable outcome of one run.

use kbplacer_core::{BoardPoint, Point, Side};
use kbplacer_layout::{LayoutFormat, MatrixMode, ParseOutput, ParseWarning};
use kbplacer_place::{FootprintRole, PlacedFootprint, PlacementFailure, PlacementOutput};
use kbplacer_route::{NetConnection, RoutingOutput, Unrouted};
use serde::Serialize;

/// Move one footprint to an absolute board position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementCommand {
    pub reference: String,
    pub role: FootprintRole,
    /// `Key::index` of the key the footprint belongs to.
    pub key: usize,
    pub position: BoardPoint,
    /// Same position in millimetres, for readers of the report.
    pub position_mm: Point,
    pub rotation: f64,
    pub side: Side,
    pub mirrored: bool,
}

impl PlacementCommand {
    fn new(key: usize, fp: &PlacedFootprint) -> Self {
        Self {
            reference: fp.reference().to_string(),
            role: fp.role,
            key,
            position: fp.position,
            position_mm: fp.position.to_mm(),
            rotation: fp.rotation,
            side: fp.side,
            mirrored: fp.mirrored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub format: LayoutFormat,
    pub matrix_mode: MatrixMode,
    pub placements: Vec<PlacementCommand>,
    /// Empty when routing is disabled.
    pub connections: Vec<NetConnection>,
    pub warnings: Vec<ParseWarning>,
    pub unresolved: Vec<PlacementFailure>,
    pub unrouted: Vec<Unrouted>,
}

impl Report {
    /// Footprints left where they are (`UNCHANGED`) produce no command.
    #[must_use]
    pub fn new(
        parsed: ParseOutput,
        placed: PlacementOutput,
        routed: Option<RoutingOutput>,
    ) -> Self {
        let placements = placed
            .placements
            .iter()
            .flat_map(|p| {
                p.footprints()
                    .filter(|fp| fp.apply)
                    .map(move |fp| PlacementCommand::new(p.key, fp))
            })
            .collect();
        let routed = routed.unwrap_or_default();
        Self {
            format: parsed.format,
            matrix_mode: parsed.layout.matrix_mode,
            placements,
            connections: routed.connections,
            warnings: parsed.warnings,
            unresolved: placed.failures,
            unrouted: routed.unrouted,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.unrouted.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
