use std::fmt;
use std::str::FromStr;

use kbplacer_core::{BoardPoint, NM_PER_MM};
use kbplacer_place::FootprintPlacement;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collision::{collide, Segment};
use crate::graph::{Link, Net, NetId, PadSelectors, RoutingGraph};
use crate::track::{track_points, Posture};

/// Copper layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    #[serde(rename = "F.Cu")]
    Front,
    #[serde(rename = "B.Cu")]
    Back,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Front => "F.Cu",
            Self::Back => "B.Cu",
        })
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("F.Cu") {
            Ok(Self::Front)
        } else if s.eq_ignore_ascii_case("B.Cu") {
            Ok(Self::Back)
        } else {
            Err(format!("unknown layer \"{s}\", expected F.Cu or B.Cu"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub switch_diode_layer: Layer,
    pub row_layer: Layer,
    pub column_layer: Layer,
    /// Minimum gap between tracks of different nets; 0 only rejects overlap.
    pub clearance_mm: f64,
    pub pads: PadSelectors,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            switch_diode_layer: Layer::Back,
            row_layer: Layer::Front,
            column_layer: Layer::Back,
            clearance_mm: 0.0,
            pads: PadSelectors::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackSegment {
    pub start: BoardPoint,
    pub end: BoardPoint,
    pub layer: Layer,
}

impl TrackSegment {
    #[must_use]
    pub fn geometry(&self) -> Segment {
        Segment::new(self.start, self.end)
    }
}

/// A routed pad-to-pad connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetConnection {
    pub net: NetId,
    pub from: String,
    pub to: String,
    pub posture: Posture,
    pub segments: Vec<TrackSegment>,
}

impl NetConnection {
    #[must_use]
    pub fn layer(&self) -> Option<Layer> {
        self.segments.first().map(|s| s.layer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutedReason {
    /// Every candidate track crossed a track of another net.
    Collision,
    /// A pad the net needs does not exist on the footprint.
    MissingPad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unrouted {
    pub net: NetId,
    pub from: String,
    pub to: Option<String>,
    pub start: Option<BoardPoint>,
    pub end: Option<BoardPoint>,
    pub reason: UnroutedReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingOutput {
    pub connections: Vec<NetConnection>,
    pub unrouted: Vec<Unrouted>,
}

/// Tracks committed so far in one routing run.
#[derive(Debug, Default)]
struct Committed {
    segments: Vec<(NetId, TrackSegment)>,
    clearance_nm: i64,
}

impl Committed {
    fn blocks(&self, net: NetId, candidate: &TrackSegment) -> bool {
        let geometry = candidate.geometry();
        self.segments.iter().any(|(n, s)| {
            *n != net
                && s.layer == candidate.layer
                && collide(&s.geometry(), &geometry, self.clearance_nm)
        })
    }

    fn commit(&mut self, net: NetId, segments: &[TrackSegment]) {
        self.segments.extend(segments.iter().map(|s| (net, *s)));
    }
}

/// Try each posture in turn and commit the first whose segments are all clear.
fn attempt(
    board: &mut Committed,
    link: &Link,
    layer: Layer,
    postures: &[Posture],
) -> Result<NetConnection, Unrouted> {
    let mut tried: Vec<Vec<BoardPoint>> = Vec::new();
    for &posture in postures {
        let points = track_points(link.from.position, link.to.position, posture);
        if tried.contains(&points) {
            continue;
        }
        let segments: Vec<TrackSegment> = points
            .windows(2)
            .map(|w| TrackSegment {
                start: w[0],
                end: w[1],
                layer,
            })
            .collect();
        if segments.iter().any(|s| board.blocks(link.net, s)) {
            debug!(net = %link.net, from = %link.from.label(), to = %link.to.label(), ?posture, "track collides");
            tried.push(points);
            continue;
        }
        board.commit(link.net, &segments);
        return Ok(NetConnection {
            net: link.net,
            from: link.from.label(),
            to: link.to.label(),
            posture,
            segments,
        });
    }
    Err(Unrouted {
        net: link.net,
        from: link.from.label(),
        to: Some(link.to.label()),
        start: Some(link.from.position),
        end: Some(link.to.position),
        reason: UnroutedReason::Collision,
    })
}

/// Best-effort router for the switch matrix.
///
/// Each connection is tried with the diagonal run at the start and, if that
/// collides, at the end. Connections that fit neither way are reported, never
/// forced onto the board.
pub struct MatrixRouter {
    config: RouterConfig,
}

impl MatrixRouter {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[must_use]
    pub fn route(&self, placements: &[FootprintPlacement]) -> RoutingOutput {
        let graph = RoutingGraph::build(placements, &self.config.pads);
        self.route_graph(&graph)
    }

    #[must_use]
    pub fn route_graph(&self, graph: &RoutingGraph) -> RoutingOutput {
        let mut out = RoutingOutput::default();
        for missing in &graph.missing {
            warn!(net = %missing.net, reference = %missing.reference, pad = %missing.pad, "pad not found");
            out.unrouted.push(Unrouted {
                net: missing.net,
                from: format!("{}:{}", missing.reference, missing.pad),
                to: None,
                start: None,
                end: None,
                reason: UnroutedReason::MissingPad,
            });
        }

        let mut board = Committed {
            segments: Vec::new(),
            clearance_nm: (self.config.clearance_mm * NM_PER_MM).round() as i64,
        };
        // switch-diode offsets are fixed by placement, one shape is enough
        for link in &graph.switch_diode {
            Self::connect(
                &mut board,
                link,
                self.config.switch_diode_layer,
                &[Posture::DiagonalFirst],
                &mut out,
            );
        }
        for link in graph.rows.iter().flat_map(Net::links) {
            Self::connect(&mut board, &link, self.config.row_layer, &Posture::ALL, &mut out);
        }
        for link in graph.columns.iter().flat_map(Net::links) {
            Self::connect(&mut board, &link, self.config.column_layer, &Posture::ALL, &mut out);
        }

        info!(
            routed = out.connections.len(),
            unrouted = out.unrouted.len(),
            "routing finished"
        );
        out
    }

    fn connect(
        board: &mut Committed,
        link: &Link,
        layer: Layer,
        postures: &[Posture],
        out: &mut RoutingOutput,
    ) {
        if link.from.position == link.to.position {
            debug!(net = %link.net, from = %link.from.label(), to = %link.to.label(), "pads coincide, nothing to route");
            return;
        }
        match attempt(board, link, layer, postures) {
            Ok(connection) => {
                debug!(
                    net = %connection.net,
                    from = %connection.from,
                    to = %connection.to,
                    segments = connection.segments.len(),
                    "routed"
                );
                out.connections.push(connection);
            }
            Err(unrouted) => {
                warn!(net = %unrouted.net, from = %unrouted.from, to = ?unrouted.to, "could not route connection");
                out.unrouted.push(unrouted);
            }
        }
    }
}
