//! Keyboard layout model and readers.
//!
//! Every reader produces the same [`Layout`]: keys in description order, each
//! with its unrotated top-left corner, its rotations and its matrix position.

mod collapse;
mod ergogen;
pub mod error;
mod groups;
mod kle;
pub mod matrix;
pub mod model;
pub mod value;
mod via;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::{LayoutError, ParseWarning};
pub use model::{
    round6, Key, Layout, LayoutMeta, LayoutOption, MatrixMode, MatrixPosition, Rotation,
    SourceLocation, ANNOTATION_LABEL, LABEL_SLOTS, LAYOUT_OPTION_LABEL, MATRIX_LABEL,
};
pub use value::Value;

/// Default ergogen key unit in millimetres.
pub const ERGOGEN_UNIT: f64 = 19.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Assign matrix positions from visual order when annotations are missing.
    pub sequential_fallback: bool,
    /// Fold alternative layouts onto their default choice.
    pub collapse: bool,
    /// Millimetres per key unit for ergogen points.
    pub ergogen_unit: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            sequential_fallback: false,
            collapse: false,
            ergogen_unit: ERGOGEN_UNIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutFormat {
    Kle,
    Via,
    Internal,
    Ergogen,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutput {
    pub format: LayoutFormat,
    pub layout: Layout,
    pub warnings: Vec<ParseWarning>,
}

/// Work out which reader understands `doc`.
pub fn detect_format(doc: &Value) -> Result<LayoutFormat, LayoutError> {
    match doc {
        Value::Seq(_) => Ok(LayoutFormat::Kle),
        Value::Map(_) if via::is_via(doc) => Ok(LayoutFormat::Via),
        Value::Map(m) if m.contains_key("keys") && m.contains_key("meta") => {
            Ok(LayoutFormat::Internal)
        }
        Value::Map(_) if ergogen::is_ergogen(doc) => Ok(LayoutFormat::Ergogen),
        Value::Map(m) if m.is_empty() => Err(LayoutError::UnknownFormat("empty object".into())),
        Value::Map(_) => Err(LayoutError::UnknownFormat(
            "object is neither a VIA definition, a serialized layout nor ergogen points".into(),
        )),
        other => Err(LayoutError::UnknownFormat(format!(
            "expected an array or an object, got {}",
            kind(other)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Seq(_) => "an array",
        Value::Map(_) => "an object",
    }
}

/// Read any supported layout document into a [`Layout`].
pub fn parse_layout(doc: &Value, options: &ParseOptions) -> Result<ParseOutput, LayoutError> {
    let format = detect_format(doc)?;
    let mut warnings = Vec::new();
    let mut matrix_size = None;
    let mut sequential_fallback = options.sequential_fallback;

    let mut layout = match format {
        LayoutFormat::Kle => {
            let out = kle::parse_kle(doc, &mut warnings)?;
            Layout {
                meta: out.meta,
                keys: out.keys,
                ..Layout::default()
            }
        }
        LayoutFormat::Via => {
            let out = via::parse_via(doc, &mut warnings)?;
            matrix_size = out.matrix_size;
            // VIA keymaps are matrix-annotated by definition
            sequential_fallback = false;
            Layout {
                meta: out.kle.meta,
                keys: out.kle.keys,
                ..Layout::default()
            }
        }
        LayoutFormat::Internal => serde_json::from_value::<Layout>(doc.to_json_value())
            .map_err(|e| LayoutError::Internal(e.to_string()))?,
        LayoutFormat::Ergogen => {
            let (meta, keys) = ergogen::parse_ergogen(doc, options.ergogen_unit)?;
            Layout {
                meta,
                keys,
                ..Layout::default()
            }
        }
    };
    if layout.keys.is_empty() {
        return Err(LayoutError::Empty);
    }

    matrix::read_annotations(&mut layout.keys);
    if matrix::resolve_positions(&mut layout.keys, sequential_fallback, &mut warnings)?
        == MatrixMode::Sequential
    {
        layout.matrix_mode = MatrixMode::Sequential;
    }
    matrix::check_unique(&layout.keys)?;
    if let Some((rows, cols)) = matrix_size {
        matrix::check_bounds(&layout.keys, rows, cols)?;
    }
    if options.collapse {
        collapse::collapse(&mut layout, &mut warnings);
    }

    info!(
        ?format,
        keys = layout.keys.len(),
        alternatives = layout.alternative_keys.len(),
        mode = ?layout.matrix_mode,
        warnings = warnings.len(),
        "parsed layout"
    );
    Ok(ParseOutput {
        format,
        layout,
        warnings,
    })
}

/// Parse layout text (JSON or YAML).
pub fn parse_layout_str(text: &str, options: &ParseOptions) -> Result<ParseOutput, LayoutError> {
    let doc = Value::from_text(text)?;
    parse_layout(&doc, options)
}
