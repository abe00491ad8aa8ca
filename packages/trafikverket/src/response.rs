//! Normalization of the Trafikverket JSON envelope.
//!
//! Responses look like
//! `{"RESPONSE": {"RESULT": [{"<ObjectType>": [...], "INFO": {...}}]}}`
//! but the object-type field may be missing, a single object, or an array
//! depending on cardinality, and `RESULT` may be empty or absent when
//! nothing matched. These helpers turn all of that into one shape right
//! after deserialization so nothing downstream probes nesting paths.

use serde_json::Value;

use crate::UpstreamError;

/// Returns the first entry of `RESPONSE.RESULT`.
///
/// `Ok(None)` means the envelope is valid but holds no result (no data).
///
/// # Errors
///
/// Returns [`UpstreamError::Malformed`] if there is no `RESPONSE` object
/// or `RESULT` (or its first entry) is not an object, and [`UpstreamError::Upstream`] if
/// the result carries an `ERROR` block.
pub fn first_result(body: &Value) -> Result<Option<&Value>, UpstreamError> {
    let response = body
        .get("RESPONSE")
        .filter(|r| r.is_object())
        .ok_or_else(|| UpstreamError::Malformed {
            message: "missing RESPONSE envelope".to_string(),
        })?;

    let result = match response.get("RESULT") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(results)) => match results.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        Some(obj @ Value::Object(_)) => obj,
        Some(other) => {
            return Err(UpstreamError::Malformed {
                message: format!("RESULT has unexpected type: {}", type_name(other)),
            });
        }
    };

    match result {
        Value::Object(_) => {}
        Value::Null => return Ok(None),
        other => {
            return Err(UpstreamError::Malformed {
                message: format!("RESULT entry has unexpected type: {}", type_name(other)),
            });
        }
    }

    if let Some(error) = result.get("ERROR") {
        return Err(UpstreamError::Upstream {
            origin: error
                .get("SOURCE")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            message: error
                .get("MESSAGE")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string(),
        });
    }

    Ok(Some(result))
}

/// Extracts the `object_type` collection from a result as an array.
///
/// Absent or `null` becomes empty, a single object becomes a one-element
/// vector, and an array is returned as-is.
///
/// # Errors
///
/// Returns [`UpstreamError::Malformed`] if the field holds a scalar.
pub fn collection(result: Option<&Value>, object_type: &str) -> Result<Vec<Value>, UpstreamError> {
    match result.and_then(|r| r.get(object_type)) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(obj @ Value::Object(_)) => Ok(vec![obj.clone()]),
        Some(other) => Err(UpstreamError::Malformed {
            message: format!(
                "{object_type} has unexpected type: {}",
                type_name(other)
            ),
        }),
    }
}

/// Extracts the evaluation result stored under `alias`.
///
/// `INFO.EVALRESULT` is an array of single-key objects (occasionally a
/// bare object). An array value yields its first element. Returns `None`
/// when the alias is missing, `null`, or an empty array/object.
#[must_use]
pub fn eval_result<'a>(result: Option<&'a Value>, alias: &str) -> Option<&'a Value> {
    let eval = result?.get("INFO")?.get("EVALRESULT")?;
    let value = match eval {
        Value::Array(entries) => entries.iter().find_map(|entry| entry.get(alias))?,
        Value::Object(_) => eval.get(alias)?,
        _ => return None,
    };
    let value = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

/// Looks up `path` in an object, first as a literal key and then as a
/// dot-separated nested path.
///
/// Upstream flattens some nested fields (`"Geometry.WKT-SWEREF99TM-3D"`)
/// and nests others, depending on schema version.
#[must_use]
pub fn field<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(path) {
        return Some(value);
    }
    path.split('.')
        .try_fold(object, |current, segment| current.get(segment))
}

/// Reads a number that may be encoded as a JSON number or a string.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
