//! JSON input mapping.
//!
//! The CLI accepts template variables as a JSON object; every top-level key
//! becomes a declared variable. JSON types map onto the engine's type model:
//! bool and string map directly, numbers become ints unless fractional,
//! arrays become lists with the element type inferred from the first
//! element, and objects become string-keyed maps with the value type
//! inferred from the first entry. Null and empty containers have no type to
//! infer and are rejected.

use thiserror::Error;

use serde_json::Value as Json;
use velo_plan::{Engine, TypeId, Value};

/// A JSON data file the type model cannot express.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("top-level JSON data must be an object")]
    NotAnObject,
    #[error("variable `{0}` is null, which has no template type")]
    NullValue(String),
    #[error("variable `{0}` is an empty array, so its element type is unknown")]
    EmptyArray(String),
    #[error("variable `{0}` mixes element types in one array")]
    MixedArray(String),
    #[error("variable `{0}` is an empty object, so its value type is unknown")]
    EmptyObject(String),
    #[error("variable `{0}` mixes value types in one object")]
    MixedObject(String),
}

/// Declare every top-level key as an engine variable and convert the values
/// for [`RenderState::set_value`].
///
/// [`RenderState::set_value`]: velo_plan::RenderState::set_value
pub fn declare_inputs(engine: &Engine, json: &Json) -> Result<Vec<(String, Value)>, InputError> {
    let Json::Object(entries) = json else {
        return Err(InputError::NotAnObject);
    };

    let mut values = Vec::with_capacity(entries.len());
    for (name, item) in entries {
        let ty = json_type(engine, item, name)?;
        engine.define_variable(name, ty);
        values.push((name.clone(), json_value(item)));
    }
    Ok(values)
}

/// Infer the engine type of a JSON value. `name` is only for error messages.
fn json_type(engine: &Engine, json: &Json, name: &str) -> Result<TypeId, InputError> {
    match json {
        Json::Null => Err(InputError::NullValue(name.to_string())),
        Json::Bool(_) => Ok(TypeId::BOOL),
        Json::Number(n) => Ok(if n.is_i64() { TypeId::INT } else { TypeId::FLOAT }),
        Json::String(_) => Ok(TypeId::STR),
        Json::Array(items) => {
            let Some(first) = items.first() else {
                return Err(InputError::EmptyArray(name.to_string()));
            };
            let elem = json_type(engine, first, name)?;
            for item in &items[1..] {
                if json_type(engine, item, name)? != elem {
                    return Err(InputError::MixedArray(name.to_string()));
                }
            }
            Ok(engine.types().list_of(elem))
        }
        Json::Object(entries) => {
            let mut vals = entries.values();
            let Some(first) = vals.next() else {
                return Err(InputError::EmptyObject(name.to_string()));
            };
            let value = json_type(engine, first, name)?;
            for item in vals {
                if json_type(engine, item, name)? != value {
                    return Err(InputError::MixedObject(name.to_string()));
                }
            }
            Ok(engine.types().map_of(value))
        }
    }
}

/// Convert a JSON value into an engine value. Assumes `json_type` accepted it.
fn json_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i),
            None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::string(s.as_str()),
        Json::Array(items) => Value::list(items.iter().map(json_value).collect()),
        Json::Object(entries) => Value::map(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), json_value(item)))
                .collect(),
        ),
    }
}
