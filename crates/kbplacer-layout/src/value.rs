use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Format-neutral document tree shared by every layout reader.
///
/// Maps keep insertion order so KLE metadata and ergogen point order survive
/// a JSON or YAML round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Seq(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Finite numbers, and strings that parse as finite numbers (KLE files
    /// contain both). `NaN` and infinities are not numbers here.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Value::Number(n) => *n,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for seg in path.split('.').filter(|s| !s.is_empty()) {
            let Value::Map(m) = current else {
                return None;
            };
            current = m.get(seg)?;
        }
        Some(current)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, LayoutError> {
        let v: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Self::try_from_yaml_value(&v)
    }

    fn try_from_yaml_value(v: &serde_yaml::Value) -> Result<Self, LayoutError> {
        Ok(match v {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(*b),
            serde_yaml::Value::Number(n) => Value::Number(
                n.as_f64()
                    .or_else(|| n.as_i64().map(|i| i as f64))
                    .or_else(|| n.as_u64().map(|u| u as f64))
                    .ok_or(LayoutError::YamlNumber)?,
            ),
            serde_yaml::Value::String(s) => Value::String(s.clone()),
            serde_yaml::Value::Sequence(seq) => Value::Seq(
                seq.iter()
                    .map(Self::try_from_yaml_value)
                    .collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(map) => {
                let mut out = IndexMap::new();
                for (k, vv) in map {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        _ => return Err(LayoutError::NonStringKey),
                    };
                    out.insert(key, Self::try_from_yaml_value(vv)?);
                }
                Value::Map(out)
            }
            serde_yaml::Value::Tagged(tagged) => Self::try_from_yaml_value(&tagged.value)?,
        })
    }

    pub fn try_from_json_str(s: &str) -> Result<Self, LayoutError> {
        let v: serde_json::Value =
            serde_json::from_str(s).map_err(|e| LayoutError::Json(e.to_string()))?;
        Ok(Self::from_json_value(&v))
    }

    /// JSON first, then YAML (which also accepts most JSON documents).
    pub fn from_text(text: &str) -> Result<Self, LayoutError> {
        match Self::try_from_json_str(text) {
            Ok(v) => Ok(v),
            Err(json_err) => Self::from_yaml_str(text).map_err(|_| json_err),
        }
    }

    #[must_use]
    pub fn from_json_value(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(a) => {
                Value::Seq(a.iter().map(Self::from_json_value).collect())
            }
            serde_json::Value::Object(o) => {
                let mut m = IndexMap::new();
                for (k, v) in o {
                    m.insert(k.clone(), Self::from_json_value(v));
                }
                Value::Map(m)
            }
        }
    }

    /// Integral numbers come back as JSON integers so typed deserialization
    /// into integer fields keeps working.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Seq(s) => serde_json::Value::Array(s.iter().map(Value::to_json_value).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_and_json_agree() {
        let json = Value::try_from_json_str(r#"{"a": [1, "x", null], "b": {"c": true}}"#).unwrap();
        let yaml = Value::from_yaml_str("a: [1, x, ~]\nb:\n  c: true\n").unwrap();
        assert_eq!(json, yaml);
        assert_eq!(json.get_path("b.c"), Some(&Value::Bool(true)));
    }

    #[test]
    fn numeric_strings_read_as_numbers() {
        assert_eq!(Value::String(" 1.25 ".into()).as_f64(), Some(1.25));
        assert_eq!(Value::String("x".into()).as_f64(), None);
        assert_eq!(Value::String("nan".into()).as_f64(), None);
        assert_eq!(Value::String("-inf".into()).as_f64(), None);
        assert_eq!(Value::Number(f64::INFINITY).as_f64(), None);
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let v = Value::Seq(vec![Value::Number(3.0), Value::Number(0.5)]);
        assert_eq!(v.to_json_value(), serde_json::json!([3, 0.5]));
    }

    #[test]
    fn from_text_falls_back_to_yaml() {
        let v = Value::from_text("- [x, y]\n").unwrap();
        assert_eq!(
            v,
            Value::Seq(vec![Value::Seq(vec![
                Value::String("x".into()),
                Value::String("y".into())
            ])])
        );
    }
}
