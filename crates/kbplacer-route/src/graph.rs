//! Matrix topology derived from placed footprints.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use kbplacer_core::BoardPoint;
use kbplacer_layout::MatrixPosition;
use kbplacer_place::{FootprintPlacement, PlacedFootprint};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum NetId {
    Row(u32),
    Column(u32),
    /// Link between a switch and its diode, keyed by the diode's footprint number.
    SwitchDiode(u32),
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(r) => write!(f, "ROW{r}"),
            Self::Column(c) => write!(f, "COL{c}"),
            Self::SwitchDiode(n) => write!(f, "SD{n}"),
        }
    }
}

/// Pad numbers joined by each kind of net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadSelectors {
    /// Switch pad on the column net.
    pub column: String,
    /// Diode pad on the row net.
    pub row: String,
    /// Switch pad wired to its diode.
    pub switch: String,
    /// Diode pad wired to its switch.
    pub diode: String,
}

impl Default for PadSelectors {
    fn default() -> Self {
        Self {
            column: "1".to_string(),
            row: "1".to_string(),
            switch: "2".to_string(),
            diode: "2".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadRef {
    pub reference: String,
    pub pad: String,
    pub position: BoardPoint,
}

impl PadRef {
    fn of(footprint: &PlacedFootprint, pad: &str) -> Option<Self> {
        Some(Self {
            reference: footprint.reference().to_string(),
            pad: pad.to_string(),
            position: footprint.pad_position(pad)?,
        })
    }

    /// `REF:PAD`, e.g. `SW3:1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}", self.reference, self.pad)
    }
}

/// A pad a net needs that the footprint does not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPad {
    pub net: NetId,
    pub reference: String,
    pub pad: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Net {
    pub id: NetId,
    /// Members in routing order.
    pub pads: Vec<PadRef>,
}

impl Net {
    /// Consecutive member pairs.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.pads.windows(2).map(|w| Link {
            net: self.id,
            from: w[0].clone(),
            to: w[1].clone(),
        })
    }
}

/// One pad-to-pad connection to route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub net: NetId,
    pub from: PadRef,
    pub to: PadRef,
}

/// Row, column and switch-diode nets of one routing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingGraph {
    pub switch_diode: Vec<Link>,
    pub rows: Vec<Net>,
    pub columns: Vec<Net>,
    pub missing: Vec<MissingPad>,
}

impl RoutingGraph {
    /// Column nets are ordered top to bottom, row nets left to right, so
    /// consecutive members are neighbours and tracks rarely cross.
    ///
    /// Alternative-layout keys without a diode of their own are wired to the
    /// diode of the default key on the same matrix position. Extra diodes
    /// share the switch-diode net of their key but never join a row.
    #[must_use]
    pub fn build(placements: &[FootprintPlacement], pads: &PadSelectors) -> Self {
        let shared: HashMap<MatrixPosition, (u32, &PlacedFootprint)> = placements
            .iter()
            .filter(|p| !p.alternative)
            .filter_map(|p| Some((p.matrix?, (p.number, p.diode.as_ref()?))))
            .collect();

        let mut graph = Self::default();
        let mut rows: BTreeMap<u32, Vec<PadRef>> = BTreeMap::new();
        let mut columns: BTreeMap<u32, Vec<PadRef>> = BTreeMap::new();

        for p in placements {
            let Some(matrix) = p.matrix else {
                debug!(key = p.key, "key has no matrix position, not routed");
                continue;
            };
            if let Some(pad) = graph.pad(&p.switch, &pads.column, NetId::Column(matrix.column)) {
                columns.entry(matrix.column).or_default().push(pad);
            }

            let diode = match &p.diode {
                Some(d) => Some((p.number, d)),
                None => shared.get(&matrix).copied(),
            };
            if diode.is_none() && p.extra_diodes.is_empty() {
                debug!(key = p.key, "key has no diode, row and switch link skipped");
                continue;
            }
            if let Some(d) = &p.diode {
                if let Some(pad) = graph.pad(d, &pads.row, NetId::Row(matrix.row)) {
                    rows.entry(matrix.row).or_default().push(pad);
                }
            }

            let net = NetId::SwitchDiode(diode.map_or(p.number, |(owner, _)| owner));
            let from = graph.pad(&p.switch, &pads.switch, net);
            let diodes = diode.map(|(_, d)| d).into_iter().chain(&p.extra_diodes);
            for d in diodes {
                let to = graph.pad(d, &pads.diode, net);
                if let (Some(from), Some(to)) = (&from, to) {
                    graph.switch_diode.push(Link {
                        net,
                        from: from.clone(),
                        to,
                    });
                }
            }
        }

        graph.columns = columns
            .into_iter()
            .map(|(c, mut pads)| {
                pads.sort_by_key(|p| (p.position.y, p.position.x));
                Net {
                    id: NetId::Column(c),
                    pads,
                }
            })
            .collect();
        graph.rows = rows
            .into_iter()
            .map(|(r, mut pads)| {
                pads.sort_by_key(|p| (p.position.x, p.position.y));
                Net {
                    id: NetId::Row(r),
                    pads,
                }
            })
            .collect();
        graph
    }

    fn pad(&mut self, footprint: &PlacedFootprint, number: &str, net: NetId) -> Option<PadRef> {
        let pad = PadRef::of(footprint, number);
        if pad.is_none() {
            self.missing.push(MissingPad {
                net,
                reference: footprint.reference().to_string(),
                pad: number.to_string(),
            });
        }
        pad
    }

    /// Every link in routing order: switch-diode links, then rows, then columns.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.switch_diode
            .iter()
            .cloned()
            .chain(self.rows.iter().flat_map(Net::links))
            .chain(self.columns.iter().flat_map(Net::links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbplacer_layout::{parse_layout, ParseOptions, Value};
    use kbplacer_place::{PlacementConfig, PlacementEngine, StandardCatalog};
    use serde_json::json;

    fn placements(layout: serde_json::Value) -> Vec<FootprintPlacement> {
        let layout = parse_layout(&Value::from_json_value(&layout), &ParseOptions::default())
            .unwrap()
            .layout;
        PlacementEngine::new(PlacementConfig::default())
            .place(&layout, &StandardCatalog::default())
            .unwrap()
            .placements
    }

    #[test]
    fn nets_follow_matrix_positions() {
        // matrix row 1 sits on the top layout row
        let graph = RoutingGraph::build(
            &placements(json!([["1,0", "1,1"], ["0,0", "0,1"]])),
            &PadSelectors::default(),
        );
        assert_eq!(graph.switch_diode.len(), 4);
        assert_eq!(graph.rows.len(), 2);
        assert_eq!(graph.columns.len(), 2);
        assert!(graph.missing.is_empty());

        let col0: Vec<_> = graph.columns[0].pads.iter().map(PadRef::label).collect();
        assert_eq!(col0, vec!["SW1:1", "SW3:1"]);
        let row1: Vec<_> = graph.rows[1].pads.iter().map(PadRef::label).collect();
        assert_eq!(row1, vec!["D1:1", "D2:1"]);
        assert_eq!(graph.links().count(), 4 + 2 + 2);
        assert_eq!(graph.links().next().map(|l| l.net), Some(NetId::SwitchDiode(1)));
    }

    #[test]
    fn missing_pads_are_collected() {
        let pads = PadSelectors {
            column: "5".to_string(),
            ..PadSelectors::default()
        };
        let graph = RoutingGraph::build(&placements(json!([["0,0"]])), &pads);
        assert_eq!(
            graph.missing,
            vec![MissingPad {
                net: NetId::Column(0),
                reference: "SW1".to_string(),
                pad: "5".to_string(),
            }]
        );
        assert!(graph.columns.is_empty());
        assert_eq!(graph.switch_diode.len(), 1);
    }

    #[test]
    fn net_names() {
        assert_eq!(NetId::Row(2).to_string(), "ROW2");
        assert_eq!(NetId::Column(0).to_string(), "COL0");
        assert_eq!(NetId::SwitchDiode(7).to_string(), "SD7");
    }
}
