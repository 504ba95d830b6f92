//! Menu item schema: the shape sent to the vision model for schema-guided
//! generation, and the gate every model response passes before it becomes a
//! [`Dish`] or leaves the service as a [`MenuItem`].

use crate::domain::model::{Dish, MenuItem};
use crate::utils::error::MenuError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Keys a model may use to wrap the item array in a top-level object.
const WRAPPER_KEYS: [&str; 4] = ["items", "menu", "menuItems", "dishes"];

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").expect("fence pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<SchemaViolation> for MenuError {
    fn from(violation: SchemaViolation) -> Self {
        MenuError::malformed(violation.to_string())
    }
}

/// JSON schema for the extraction call. The image field is absent here; it is
/// filled in by enrichment.
pub fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "The name of the menu item" },
                        "price": { "type": "string", "description": "The price of the menu item" },
                        "description": {
                            "type": "string",
                            "description": "A detailed description of the menu item"
                        }
                    },
                    "required": ["name", "price", "description"]
                }
            }
        },
        "required": ["items"]
    })
}

/// Parses the raw text content of a model reply into dishes.
///
/// The batch is accepted or rejected as a whole: one bad entry rejects all of
/// them.
pub fn parse_model_output(content: &str) -> Result<Vec<Dish>, SchemaViolation> {
    let body = strip_code_fence(content);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(first_err) => {
            let embedded = embedded_json(body).ok_or_else(|| {
                SchemaViolation::new("$", format!("not valid JSON: {}", first_err))
            })?;
            serde_json::from_str(embedded)
                .map_err(|e| SchemaViolation::new("$", format!("not valid JSON: {}", e)))?
        }
    };
    coerce_dishes(&value)
}

pub fn coerce_dishes(value: &Value) -> Result<Vec<Dish>, SchemaViolation> {
    item_array(value)?
        .iter()
        .enumerate()
        .map(|(index, entry)| coerce_dish(index, entry))
        .collect()
}

/// Checks an enriched item right before it is handed to the client.
pub fn validate_item(item: &MenuItem) -> Result<(), SchemaViolation> {
    for (field, value) in [
        ("name", &item.name),
        ("price", &item.price),
        ("description", &item.description),
    ] {
        if value.trim().is_empty() {
            return Err(SchemaViolation::new(field, "must not be empty"));
        }
    }
    validate_image_payload(&item.menu_image.b64_json)
}

pub fn validate_image_payload(b64_json: &str) -> Result<(), SchemaViolation> {
    const PATH: &str = "menuImage.b64_json";
    if b64_json.is_empty() {
        return Err(SchemaViolation::new(PATH, "must not be empty"));
    }
    STANDARD
        .decode(b64_json)
        .map(|_| ())
        .map_err(|e| SchemaViolation::new(PATH, format!("not valid base64: {}", e)))
}

fn strip_code_fence(content: &str) -> &str {
    match CODE_FENCE.captures(content).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => content.trim(),
    }
}

// 模型偶爾會在 JSON 前後加上說明文字，取第一個 { 或 [ 到最後一個 } 或 ]
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (end > start).then(|| &text[start..=end])
}

fn item_array(value: &Value) -> Result<&Vec<Value>, SchemaViolation> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| SchemaViolation::new("$", "expected an array of menu items")),
        _ => Err(SchemaViolation::new("$", "expected an array of menu items")),
    }
}

fn coerce_dish(index: usize, entry: &Value) -> Result<Dish, SchemaViolation> {
    let object = entry
        .as_object()
        .ok_or_else(|| SchemaViolation::new(format!("$[{}]", index), "expected an object"))?;

    Ok(Dish {
        name: text_field(object, index, "name", false)?,
        price: text_field(object, index, "price", true)?,
        description: text_field(object, index, "description", false)?,
    })
}

fn text_field(
    object: &Map<String, Value>,
    index: usize,
    field: &str,
    allow_number: bool,
) -> Result<String, SchemaViolation> {
    let path = || format!("$[{}].{}", index, field);
    let text = match object.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) if allow_number => n.to_string(),
        None | Some(Value::Null) => return Err(SchemaViolation::new(path(), "missing")),
        Some(_) => return Err(SchemaViolation::new(path(), "expected text")),
    };

    if text.is_empty() {
        return Err(SchemaViolation::new(path(), "must not be empty"));
    }
    Ok(text)
}
