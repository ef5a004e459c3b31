use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NormalizeError(pub String);

/// Flat per-sample record stored in the `row_infos` attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowInfo(Map<String, Value>);

impl RowInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Maps a raw per-sample descriptor onto a [`RowInfo`].
pub trait RowInfoTransform: Send + Sync {
    fn normalize(&self, raw: &Value) -> Result<RowInfo, NormalizeError>;
}

/// Keeps the descriptor as-is; it only has to be a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRowInfo;

impl RowInfoTransform for PassthroughRowInfo {
    fn normalize(&self, raw: &Value) -> Result<RowInfo, NormalizeError> {
        match raw {
            Value::Object(map) => Ok(RowInfo(map.clone())),
            other => Err(NormalizeError(format!(
                "expected a JSON object, found {}",
                kind(other)
            ))),
        }
    }
}

/// Cistrome DB inspector descriptors: `{"id": 46201, "species": "Homo sapiens",
/// "factor": {"name": "CTCF"}, "cell_type": {"name": "..."}, ...}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CistromeRowInfo;

const CISTROME_FIELDS: &[(&str, &str)] = &[
    ("species", "Species"),
    ("factor", "Factor"),
    ("cell_type", "Cell Type"),
    ("cell_line", "Cell Line"),
    ("tissue_type", "Tissue Type"),
    ("disease_state", "Disease State"),
];

impl RowInfoTransform for CistromeRowInfo {
    fn normalize(&self, raw: &Value) -> Result<RowInfo, NormalizeError> {
        let Value::Object(map) = raw else {
            return Err(NormalizeError(format!(
                "expected a JSON object, found {}",
                kind(raw)
            )));
        };
        let id = map
            .get("id")
            .and_then(scalar_text)
            .ok_or_else(|| NormalizeError("descriptor has no `id`".to_string()))?;

        let mut info = RowInfo::new();
        info.insert("id", Value::String(id));
        for (source, target) in CISTROME_FIELDS {
            let value = map
                .get(*source)
                .and_then(named_text)
                .map(Value::String)
                .unwrap_or(Value::Null);
            info.insert(*target, value);
        }
        Ok(info)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

// Accepts "x", {"name": "x"} and [{"name": "x"}, ...] (joined with ", ").
fn named_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("name").and_then(scalar_text),
        Value::Array(items) => {
            let names = items.iter().filter_map(named_text).collect::<Vec<_>>();
            (!names.is_empty()).then(|| names.join(", "))
        }
        other => scalar_text(other),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
