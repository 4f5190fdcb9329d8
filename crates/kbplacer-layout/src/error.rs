use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(String),

    #[error("YAML mapping keys must be strings")]
    NonStringKey,

    #[error("YAML number could not be represented as f64")]
    YamlNumber,

    #[error("unrecognized layout format: {0}")]
    UnknownFormat(String),

    #[error("layout contains no keys")]
    Empty,

    #[error("row {row}, cell {cell}: {message}")]
    Parse {
        row: usize,
        cell: usize,
        message: String,
    },

    #[error("key #{index} (row {row}, cell {cell}) has no \"row,col\" matrix position")]
    MissingMatrixPosition {
        index: usize,
        row: usize,
        cell: usize,
    },

    #[error("matrix position {row},{column} is used by keys #{first} and #{second}")]
    DuplicateMatrixPosition {
        row: u32,
        column: u32,
        first: usize,
        second: usize,
    },

    #[error("key #{index} matrix position {row},{column} is outside the {rows}x{cols} matrix")]
    MatrixOutOfRange {
        index: usize,
        row: u32,
        column: u32,
        rows: u32,
        cols: u32,
    },

    #[error("invalid serialized layout: {0}")]
    Internal(String),
}

impl LayoutError {
    pub(crate) fn parse(row: usize, cell: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            cell,
            message: message.into(),
        }
    }
}

/// Recoverable oddities found while reading a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A legend string carried more than twelve lines.
    TooManyLabels { index: usize, count: usize },
    /// The label alignment has no slot for this legend line.
    LabelDropped { index: usize, line: usize, align: usize },
    /// Matrix positions were assigned from visual order.
    SequentialMatrix { keys: usize },
    /// An alternative-layout key landed on a default key and was removed.
    DuplicateAlternative { index: usize },
}
