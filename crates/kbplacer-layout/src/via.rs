//! VIA keyboard definitions: a KLE keymap plus the declared matrix size.

use tracing::debug;

use crate::error::{LayoutError, ParseWarning};
use crate::kle::{parse_kle, KleOutput};
use crate::value::Value;

pub(crate) struct ViaOutput {
    pub kle: KleOutput,
    pub matrix_size: Option<(u32, u32)>,
}

pub(crate) fn is_via(doc: &Value) -> bool {
    matches!(doc.get_path("layouts.keymap"), Some(Value::Seq(_)))
}

pub(crate) fn parse_via(
    doc: &Value,
    warnings: &mut Vec<ParseWarning>,
) -> Result<ViaOutput, LayoutError> {
    let keymap = doc
        .get_path("layouts.keymap")
        .ok_or_else(|| LayoutError::UnknownFormat("VIA definition without layouts.keymap".into()))?;
    let mut kle = parse_kle(keymap, warnings)?;

    if kle.meta.name.is_none() {
        kle.meta.name = doc.get("name").and_then(Value::as_str).map(str::to_string);
    }
    for field in ["vendorId", "productId"] {
        if let Some(v) = doc.get(field) {
            kle.meta.extra.insert(field.to_string(), v.clone());
        }
    }

    let matrix_size = match (
        doc.get_path("matrix.rows").and_then(Value::as_f64),
        doc.get_path("matrix.cols").and_then(Value::as_f64),
    ) {
        (Some(rows), Some(cols)) => Some((rows as u32, cols as u32)),
        _ => None,
    };
    debug!(keys = kle.keys.len(), ?matrix_size, "read VIA keymap");
    Ok(ViaOutput { kle, matrix_size })
}

