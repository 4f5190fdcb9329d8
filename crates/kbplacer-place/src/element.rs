//! Element descriptors: which footprint goes with each key and where it sits
//! relative to the switch.

use std::fmt;
use std::str::FromStr;

use kbplacer_core::{Point, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    #[error("{0}: invalid format, expected ANNOTATION OPTION [X Y ORIENTATION SIDE]")]
    InvalidFormat(String),
    #[error("'{0}' invalid annotation specifier, it must contain exactly one '{{}}' placeholder")]
    Placeholder(String),
    #[error("unknown position option \"{0}\"")]
    UnknownOption(String),
    #[error("position option needs to be equal CURRENT_RELATIVE, DEFAULT or UNCHANGED if position details not provided")]
    PositionRequired,
    #[error("position option needs to be equal CUSTOM when providing position details")]
    CustomRequired,
    #[error("invalid number \"{0}\" in position")]
    Number(String),
    #[error("{0}")]
    Side(String),
    #[error("additional elements do not support DEFAULT position")]
    DefaultNotAllowed,
}

/// How an element's position is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionOption {
    /// Built-in offset for the element's role.
    Default,
    /// Offset measured on the board from the first key's switch and element.
    CurrentRelative,
    /// Offset given explicitly.
    Custom,
    /// Leave the element where it is.
    Unchanged,
}

impl FromStr for PositionOption {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Self::Default),
            "CURRENT_RELATIVE" => Ok(Self::CurrentRelative),
            "CUSTOM" => Ok(Self::Custom),
            "UNCHANGED" => Ok(Self::Unchanged),
            _ => Err(ElementError::UnknownOption(s.to_string())),
        }
    }
}

impl fmt::Display for PositionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "DEFAULT",
            Self::CurrentRelative => "CURRENT_RELATIVE",
            Self::Custom => "CUSTOM",
            Self::Unchanged => "UNCHANGED",
        })
    }
}

/// Offset (mm) and orientation (degrees) in the switch's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementPosition {
    pub offset: Point,
    #[serde(default)]
    pub orientation: f64,
    #[serde(default)]
    pub side: Side,
}

impl ElementPosition {
    #[must_use]
    pub const fn new(x: f64, y: f64, orientation: f64, side: Side) -> Self {
        Self {
            offset: Point::new(x, y),
            orientation,
            side,
        }
    }
}

pub const ZERO_POSITION: ElementPosition = ElementPosition::new(0.0, 0.0, 0.0, Side::Front);
pub const DEFAULT_DIODE_POSITION: ElementPosition =
    ElementPosition::new(5.08, 3.03, 90.0, Side::Back);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintRole {
    Switch,
    Diode,
    Additional,
}

impl FootprintRole {
    #[must_use]
    pub fn default_position(self) -> ElementPosition {
        match self {
            Self::Diode => DEFAULT_DIODE_POSITION,
            Self::Switch | Self::Additional => ZERO_POSITION,
        }
    }
}

impl fmt::Display for FootprintRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Switch => "switch",
            Self::Diode => "diode",
            Self::Additional => "additional element",
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ElementInfoRepr {
    Text(String),
    Structured {
        annotation: String,
        option: PositionOption,
        #[serde(default)]
        position: Option<ElementPosition>,
    },
}

/// A footprint family such as `"D{}"` and how to position its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ElementInfoRepr")]
pub struct ElementInfo {
    pub annotation: String,
    pub option: PositionOption,
    pub position: Option<ElementPosition>,
}

impl TryFrom<ElementInfoRepr> for ElementInfo {
    type Error = ElementError;

    fn try_from(repr: ElementInfoRepr) -> Result<Self, Self::Error> {
        match repr {
            ElementInfoRepr::Text(s) => s.parse(),
            ElementInfoRepr::Structured {
                annotation,
                option,
                position,
            } => Self::new(annotation, option, position),
        }
    }
}

impl ElementInfo {
    pub fn new(
        annotation: impl Into<String>,
        option: PositionOption,
        position: Option<ElementPosition>,
    ) -> Result<Self, ElementError> {
        let annotation = annotation.into();
        if annotation.matches("{}").count() != 1 {
            return Err(ElementError::Placeholder(annotation));
        }
        match (option, position.is_some()) {
            (PositionOption::Custom, false) => return Err(ElementError::PositionRequired),
            (PositionOption::Custom, true) | (_, false) => {}
            (_, true) => return Err(ElementError::CustomRequired),
        }
        Ok(Self {
            annotation,
            option,
            position,
        })
    }

    #[must_use]
    pub fn default_switch() -> Self {
        Self {
            annotation: "SW{}".to_string(),
            option: PositionOption::Default,
            position: None,
        }
    }

    #[must_use]
    pub fn default_diode() -> Self {
        Self {
            annotation: "D{}".to_string(),
            option: PositionOption::Default,
            position: None,
        }
    }

    #[must_use]
    pub fn default_additional() -> Vec<Self> {
        vec![Self {
            annotation: "ST{}".to_string(),
            option: PositionOption::Custom,
            position: Some(ZERO_POSITION),
        }]
    }

    /// Host reference for footprint number `n`.
    #[must_use]
    pub fn reference(&self, n: u32) -> String {
        self.annotation.replacen("{}", &n.to_string(), 1)
    }

    /// Parse a `;`-separated list; `DEFAULT` is rejected as it has no meaning
    /// for arbitrary elements.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, ElementError> {
        s.split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                let info: Self = t.parse()?;
                if info.option == PositionOption::Default {
                    return Err(ElementError::DefaultNotAllowed);
                }
                Ok(info)
            })
            .collect()
    }
}

impl FromStr for ElementInfo {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() != 2 && tokens.len() != 6 {
            return Err(ElementError::InvalidFormat(s.to_string()));
        }
        let option: PositionOption = tokens[1].parse()?;
        let position = if tokens.len() == 6 {
            let num = |t: &str| {
                t.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ElementError::Number(t.to_string()))
            };
            let side: Side = tokens[5].parse().map_err(ElementError::Side)?;
            Some(ElementPosition::new(
                num(tokens[2])?,
                num(tokens[3])?,
                num(tokens[4])?,
                side,
            ))
        } else {
            None
        };
        Self::new(tokens[0], option, position)
    }
}

impl fmt::Display for ElementInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.annotation, self.option)?;
        if let Some(p) = self.position {
            write!(
                f,
                " {} {} {} {}",
                p.offset.x, p.offset.y, p.orientation, p.side
            )?;
        }
        Ok(())
    }
}
