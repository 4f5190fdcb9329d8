//! Footprint lookup against whatever the host board provides.

use indexmap::IndexMap;
use kbplacer_core::{Point, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("footprint {0} not found")]
    NotFound(String),
    #[error("failed to parse footprint catalog: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub number: String,
    /// Offset in millimetres from the footprint origin, front-side view.
    pub offset: Point,
}

impl Pad {
    pub fn new(number: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            number: number.into(),
            offset: Point::new(x, y),
        }
    }
}

/// Where a footprint currently sits on the host board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentPlacement {
    pub position: Point,
    #[serde(default)]
    pub orientation: f64,
    #[serde(default)]
    pub side: Side,
}

/// Host-side footprint handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintRef {
    pub reference: String,
    pub pads: Vec<Pad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentPlacement>,
}

impl FootprintRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            pads: Vec::new(),
            current: None,
        }
    }

    #[must_use]
    pub fn with_pads(mut self, pads: Vec<Pad>) -> Self {
        self.pads = pads;
        self
    }

    #[must_use]
    pub fn with_current(mut self, current: CurrentPlacement) -> Self {
        self.current = Some(current);
        self
    }

    #[must_use]
    pub fn pad(&self, number: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.number == number)
    }
}

/// Resolves footprint references to host footprints.
pub trait FootprintCatalog {
    fn lookup(&self, reference: &str) -> Result<FootprintRef, CatalogError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    pads: IndexMap<String, [f64; 2]>,
    #[serde(default)]
    current: Option<CurrentPlacement>,
}

/// Explicit list of footprints, typically exported from the host board.
///
/// File form: `REF: { pads: { "1": [x, y], ... }, current: { position: {x, y}, orientation, side } }`.
#[derive(Debug, Clone, Default)]
pub struct MapCatalog {
    footprints: IndexMap<String, FootprintRef>,
}

impl MapCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, footprint: FootprintRef) {
        self.footprints.insert(footprint.reference.clone(), footprint);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    fn from_entries(entries: IndexMap<String, CatalogEntry>) -> Self {
        let mut catalog = Self::new();
        for (reference, entry) in entries {
            let pads = entry
                .pads
                .into_iter()
                .map(|(number, [x, y])| Pad::new(number, x, y))
                .collect();
            let mut fp = FootprintRef::new(reference).with_pads(pads);
            fp.current = entry.current;
            catalog.insert(fp);
        }
        catalog
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let entries: IndexMap<String, CatalogEntry> =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let entries: IndexMap<String, CatalogEntry> =
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self::from_entries(entries))
    }

    /// JSON first, then YAML.
    pub fn from_text(text: &str) -> Result<Self, CatalogError> {
        Self::from_json_str(text).or_else(|_| Self::from_yaml_str(text))
    }
}

impl FootprintCatalog for MapCatalog {
    fn lookup(&self, reference: &str) -> Result<FootprintRef, CatalogError> {
        self.footprints
            .get(reference)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(reference.to_string()))
    }
}

/// Cherry MX switch pads.
pub fn mx_pads() -> Vec<Pad> {
    vec![Pad::new("1", -3.81, -2.54), Pad::new("2", 2.54, -5.08)]
}

/// SOD-123 diode pads, cathode first.
pub fn sod123_pads() -> Vec<Pad> {
    vec![Pad::new("1", -1.65, 0.0), Pad::new("2", 1.65, 0.0)]
}

/// Catalog that assumes a freshly generated board: `SW<n>` are MX switches,
/// `D<n>` are SOD-123 diodes and any other `<prefix><n>` is a pad-less part.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalog {
    /// Highest footprint number present on the board.
    pub limit: Option<u32>,
}

impl StandardCatalog {
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self { limit: Some(limit) }
    }
}

fn split_reference(reference: &str) -> Option<(&str, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = reference.split_at(split);
    if prefix.is_empty() {
        return None;
    }
    Some((prefix, digits.parse().ok()?))
}

impl FootprintCatalog for StandardCatalog {
    fn lookup(&self, reference: &str) -> Result<FootprintRef, CatalogError> {
        let not_found = || CatalogError::NotFound(reference.to_string());
        let (prefix, number) = split_reference(reference).ok_or_else(not_found)?;
        if number == 0 || self.limit.is_some_and(|limit| number > limit) {
            return Err(not_found());
        }
        let pads = match prefix {
            "SW" => mx_pads(),
            "D" => sod123_pads(),
            _ => Vec::new(),
        };
        Ok(FootprintRef::new(reference).with_pads(pads))
    }
}
