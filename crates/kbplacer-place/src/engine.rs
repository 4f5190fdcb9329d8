use std::collections::HashSet;

use kbplacer_core::{normalize_angle, rotate_vec, BoardPoint, Point, Side, Transform};
use kbplacer_layout::{Key, Layout, MatrixPosition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{CurrentPlacement, FootprintCatalog, FootprintRef};
use crate::element::{ElementInfo, ElementPosition, FootprintRole, PositionOption};

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("invalid key distance {x} x {y} mm, both must be finite and not negative")]
    InvalidKeyDistance { x: f64, y: f64 },
    #[error("{reference} would be placed outside the board coordinate range")]
    CoordinateOutOfRange { reference: String },
    #[error("no switch footprints matching {pattern} found")]
    NoSwitchFootprints { pattern: String },
    #[error("{reference} has no position on the board to measure a relative offset from")]
    MissingReferencePosition { reference: String },
    #[error("{option} is not a valid switch position option")]
    UnsupportedSwitchOption { option: PositionOption },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Millimetres per key unit along x and y.
    pub key_distance: [f64; 2],
    /// Board offset in millimetres added to every key.
    pub origin: [f64; 2],
    /// Mirror line for mirrored keys, in key units; defaults to the right
    /// edge of the unmirrored keys.
    pub mirror_axis: Option<f64>,
    pub switch: ElementInfo,
    pub diode: Option<ElementInfo>,
    /// Further diodes wired to the same switch pad as `diode`.
    pub extra_diodes: Vec<ElementInfo>,
    pub additional_elements: Vec<ElementInfo>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            key_distance: [19.05, 19.05],
            origin: [0.0, 0.0],
            mirror_axis: None,
            switch: ElementInfo::default_switch(),
            diode: Some(ElementInfo::default_diode()),
            extra_diodes: Vec::new(),
            additional_elements: ElementInfo::default_additional(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedFootprint {
    pub footprint: FootprintRef,
    pub role: FootprintRole,
    pub position: BoardPoint,
    pub rotation: f64,
    pub side: Side,
    pub mirrored: bool,
    /// Offset in the switch frame this footprint was derived with.
    pub relative: Option<ElementPosition>,
    /// `false` when the host keeps the footprint where it already is.
    pub apply: bool,
}

impl PlacedFootprint {
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.footprint.reference
    }

    /// Board position of a pad. Back-side footprints are flipped, so their
    /// local x offsets change sign.
    #[must_use]
    pub fn pad_position(&self, number: &str) -> Option<BoardPoint> {
        let pad = self.footprint.pad(number)?;
        let local = if self.side.is_back() {
            Point::new(-pad.offset.x, pad.offset.y)
        } else {
            pad.offset
        };
        let offset = BoardPoint::try_from_mm(local.x, local.y)?.rotated(self.rotation);
        self.position.checked_add(offset)
    }
}

/// Footprints placed for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintPlacement {
    /// `Key::index` of the key.
    pub key: usize,
    pub number: u32,
    pub matrix: Option<MatrixPosition>,
    /// Key of a non-default alternative layout.
    pub alternative: bool,
    pub switch: PlacedFootprint,
    pub diode: Option<PlacedFootprint>,
    pub extra_diodes: Vec<PlacedFootprint>,
    pub additional: Vec<PlacedFootprint>,
}

impl FootprintPlacement {
    pub fn footprints(&self) -> impl Iterator<Item = &PlacedFootprint> {
        std::iter::once(&self.switch)
            .chain(self.diode.as_ref())
            .chain(self.extra_diodes.iter())
            .chain(self.additional.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    UnresolvedFootprintReference,
    NoCurrentPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementFailure {
    pub key: usize,
    pub role: FootprintRole,
    pub reference: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementOutput {
    pub placements: Vec<FootprintPlacement>,
    pub failures: Vec<PlacementFailure>,
}

#[derive(Debug, Clone, Copy)]
enum Plan {
    Relative(ElementPosition),
    Unchanged,
}

/// Frame an element is positioned against.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    position: BoardPoint,
    rotation: f64,
    mirrored: bool,
}

impl Anchor {
    /// The offset is taken in the anchor's rotated frame; a mirrored anchor
    /// flips its x and orientation first. `None` when the result leaves the
    /// board coordinate range.
    fn derive(&self, rel: &ElementPosition) -> Option<(BoardPoint, f64)> {
        let (dx, orientation) = if self.mirrored {
            (-rel.offset.x, -rel.orientation)
        } else {
            (rel.offset.x, rel.orientation)
        };
        let offset = BoardPoint::try_from_mm(dx, rel.offset.y)?.rotated(self.rotation);
        Some((
            self.position.checked_add(offset)?,
            normalize_angle(self.rotation + orientation),
        ))
    }
}

/// Offset of `element` in the local frame of `switch`.
fn measure(switch: &CurrentPlacement, element: &CurrentPlacement) -> ElementPosition {
    let offset = rotate_vec(element.position - switch.position, -switch.orientation);
    ElementPosition {
        offset,
        orientation: normalize_angle(element.orientation - switch.orientation),
        side: element.side,
    }
}

pub struct PlacementEngine {
    config: PlacementConfig,
}

impl PlacementEngine {
    #[must_use]
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    fn plan(
        &self,
        info: &ElementInfo,
        role: FootprintRole,
        catalog: &dyn FootprintCatalog,
        first: Option<u32>,
    ) -> Result<Plan, PlacementError> {
        Ok(match info.option {
            PositionOption::Default => Plan::Relative(role.default_position()),
            PositionOption::Custom => {
                Plan::Relative(info.position.unwrap_or_else(|| role.default_position()))
            }
            PositionOption::Unchanged => Plan::Unchanged,
            PositionOption::CurrentRelative => {
                if role == FootprintRole::Switch {
                    return Err(PlacementError::UnsupportedSwitchOption {
                        option: info.option,
                    });
                }
                let number = first.unwrap_or(1);
                let current = |reference: String| {
                    catalog
                        .lookup(&reference)
                        .ok()
                        .and_then(|f| f.current)
                        .ok_or(PlacementError::MissingReferencePosition { reference })
                };
                let switch = current(self.config.switch.reference(number))?;
                let element = current(info.reference(number))?;
                let rel = measure(&switch, &element);
                debug!(annotation = %info.annotation, ?rel, "measured relative position");
                Plan::Relative(rel)
            }
        })
    }

    /// Key frame in millimetres, mirrored about `axis_mm` for mirrored keys.
    fn key_frame(&self, key: &Key, axis_mm: f64) -> Transform {
        let [kx, ky] = self.config.key_distance;
        let frame = key.transform((kx, ky));
        if key.mirrored {
            Transform::mirror_x(axis_mm).then_after(&frame)
        } else {
            frame
        }
    }

    /// `Ok(None)` when the footprint is left unchanged but the host reports
    /// no position for it.
    fn place_element(
        footprint: FootprintRef,
        role: FootprintRole,
        plan: Plan,
        anchor: &Anchor,
    ) -> Result<Option<PlacedFootprint>, PlacementError> {
        let out_of_range = |footprint: &FootprintRef| PlacementError::CoordinateOutOfRange {
            reference: footprint.reference.clone(),
        };
        Ok(match plan {
            Plan::Relative(rel) => {
                let (position, rotation) =
                    anchor.derive(&rel).ok_or_else(|| out_of_range(&footprint))?;
                Some(PlacedFootprint {
                    footprint,
                    role,
                    position,
                    rotation,
                    side: rel.side,
                    mirrored: anchor.mirrored,
                    relative: Some(rel),
                    apply: true,
                })
            }
            Plan::Unchanged => {
                let Some(current) = footprint.current else {
                    return Ok(None);
                };
                let position = BoardPoint::try_from_mm(current.position.x, current.position.y)
                    .ok_or_else(|| out_of_range(&footprint))?;
                Some(PlacedFootprint {
                    position,
                    rotation: normalize_angle(current.orientation),
                    side: current.side,
                    footprint,
                    role,
                    mirrored: false,
                    relative: None,
                    apply: false,
                })
            }
        })
    }

    /// A diode is optional per key: a missing one is recorded as a failure.
    #[allow(clippy::too_many_arguments)]
    fn place_diode(
        info: &ElementInfo,
        plan: Plan,
        number: u32,
        key: &Key,
        anchor: &Anchor,
        catalog: &dyn FootprintCatalog,
        failures: &mut Vec<PlacementFailure>,
    ) -> Result<Option<PlacedFootprint>, PlacementError> {
        let reference = info.reference(number);
        let reason = match catalog.lookup(&reference) {
            Ok(fp) => match Self::place_element(fp, FootprintRole::Diode, plan, anchor)? {
                Some(diode) => return Ok(Some(diode)),
                None => FailureReason::NoCurrentPosition,
            },
            Err(err) => {
                warn!(key = key.index, %reference, %err, "diode footprint not found");
                FailureReason::UnresolvedFootprintReference
            }
        };
        failures.push(PlacementFailure {
            key: key.index,
            role: FootprintRole::Diode,
            reference,
            reason,
        });
        Ok(None)
    }

    /// Place every placeable key of `layout`.
    ///
    /// Keys are numbered by their explicit annotation or, failing that, by
    /// their ordinal among placeable keys. A key whose switch cannot be found
    /// is reported and skipped; only a layout without a single resolvable
    /// switch is an error.
    pub fn place(
        &self,
        layout: &Layout,
        catalog: &dyn FootprintCatalog,
    ) -> Result<PlacementOutput, PlacementError> {
        let [kx, ky] = self.config.key_distance;
        if !(kx.is_finite() && ky.is_finite() && kx >= 0.0 && ky >= 0.0) {
            return Err(PlacementError::InvalidKeyDistance { x: kx, y: ky });
        }
        let axis_mm = self.config.mirror_axis.unwrap_or_else(|| layout.right_edge()) * kx;
        let origin = Point::new(self.config.origin[0], self.config.origin[1]);

        let is_alternative = |k: &Key| layout.alternative_keys.contains(&k.index);
        let keys: Vec<(u32, &Key)> = layout
            .placeable_keys()
            .enumerate()
            .map(|(i, k)| (k.annotation.unwrap_or(i as u32 + 1), k))
            .collect();
        let first = keys
            .iter()
            .find(|(_, k)| !is_alternative(*k))
            .map(|(n, _)| *n);
        let default_matrix: HashSet<MatrixPosition> = keys
            .iter()
            .filter(|(_, k)| !is_alternative(*k))
            .filter_map(|(_, k)| k.matrix)
            .collect();

        let switch_plan = self.plan(&self.config.switch, FootprintRole::Switch, catalog, first)?;
        let diode_plan = match &self.config.diode {
            Some(info) => Some((info, self.plan(info, FootprintRole::Diode, catalog, first)?)),
            None => None,
        };
        let extra_diode_plans = self
            .config
            .extra_diodes
            .iter()
            .map(|info| Ok((info, self.plan(info, FootprintRole::Diode, catalog, first)?)))
            .collect::<Result<Vec<_>, PlacementError>>()?;
        let additional_plans = self
            .config
            .additional_elements
            .iter()
            .map(|info| Ok((info, self.plan(info, FootprintRole::Additional, catalog, first)?)))
            .collect::<Result<Vec<_>, PlacementError>>()?;

        let mut out = PlacementOutput::default();
        for (number, key) in keys {
            let alternative = is_alternative(key);
            let reference = self.config.switch.reference(number);
            let footprint = match catalog.lookup(&reference) {
                Ok(fp) => fp,
                Err(err) => {
                    warn!(key = key.index, %reference, %err, "switch footprint not found");
                    out.failures.push(PlacementFailure {
                        key: key.index,
                        role: FootprintRole::Switch,
                        reference,
                        reason: FailureReason::UnresolvedFootprintReference,
                    });
                    continue;
                }
            };

            let frame = self.key_frame(key, axis_mm);
            let center = frame.offset + origin;
            let key_anchor = Anchor {
                position: BoardPoint::try_from_mm(center.x, center.y).ok_or_else(|| {
                    PlacementError::CoordinateOutOfRange {
                        reference: reference.clone(),
                    }
                })?,
                rotation: frame.angle,
                mirrored: frame.mirrored,
            };
            let Some(switch) =
                Self::place_element(footprint, FootprintRole::Switch, switch_plan, &key_anchor)?
            else {
                warn!(key = key.index, %reference, "switch is left unchanged but has no position");
                out.failures.push(PlacementFailure {
                    key: key.index,
                    role: FootprintRole::Switch,
                    reference,
                    reason: FailureReason::NoCurrentPosition,
                });
                continue;
            };
            let anchor = Anchor {
                position: switch.position,
                rotation: switch.rotation,
                mirrored: key_anchor.mirrored,
            };
            debug!(
                key = key.index,
                %reference,
                position = %switch.position,
                rotation = switch.rotation,
                mirrored = anchor.mirrored,
                "placed switch"
            );

            // alternative keys share the diode of the default key on the same matrix position
            let shares_diode =
                alternative && key.matrix.is_some_and(|m| default_matrix.contains(&m));
            let mut diode = None;
            let mut extra_diodes = Vec::new();
            if !shares_diode {
                let place = |(info, plan): &(&ElementInfo, Plan), failures: &mut _| {
                    Self::place_diode(info, *plan, number, key, &anchor, catalog, failures)
                };
                if let Some(plan) = &diode_plan {
                    diode = place(plan, &mut out.failures)?;
                }
                for plan in &extra_diode_plans {
                    extra_diodes.extend(place(plan, &mut out.failures)?);
                }
            }

            let mut additional = Vec::new();
            for (info, plan) in &additional_plans {
                let reference = info.reference(number);
                match catalog.lookup(&reference) {
                    Ok(fp) => {
                        additional.extend(Self::place_element(
                            fp,
                            FootprintRole::Additional,
                            *plan,
                            &anchor,
                        )?);
                    }
                    Err(_) => debug!(%reference, "additional element not present, skipped"),
                }
            }

            out.placements.push(FootprintPlacement {
                key: key.index,
                number,
                matrix: key.matrix,
                alternative,
                switch,
                diode,
                extra_diodes,
                additional,
            });
        }

        if out.placements.is_empty() {
            return Err(PlacementError::NoSwitchFootprints {
                pattern: self.config.switch.annotation.clone(),
            });
        }
        info!(
            placed = out.placements.len(),
            failures = out.failures.len(),
            "placement finished"
        );
        Ok(out)
    }
}
