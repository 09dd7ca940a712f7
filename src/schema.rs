//! JSON-Schema-ish view of a registry type.
//!
//! Documentation/debug output only; the converter never reads it back.
use serde_json::{json, Map, Value};

use crate::descriptor::{Descriptor, Literal, ObjectShape, Primitive};
use crate::error::Result;
use crate::registry::Registry;
use crate::value::json_num_pref_i64;

/// Emit the schema of `root` with every registry type under `definitions`.
pub fn emit_schema(registry: &Registry, root: &str) -> Result<Value> {
    registry.resolve(root)?;
    let mut definitions = Map::new();
    for (name, typ) in registry.iter() {
        definitions.insert(name.to_string(), schema_of(typ));
    }
    Ok(json!({
        "$ref": ref_path(root),
        "definitions": definitions,
    }))
}

pub fn schema_of(typ: &Descriptor) -> Value {
    match typ {
        Descriptor::Primitive(p) => match p {
            Primitive::String => json!({ "type": "string" }),
            Primitive::Number => json!({ "type": "number" }),
            Primitive::Boolean => json!({ "type": "boolean" }),
            Primitive::Null => json!({ "type": "null" }),
            Primitive::Any | Primitive::Undefined => json!({}),
        },
        Descriptor::Date => json!({ "type": ["string", "null"], "format": "date-time" }),
        Descriptor::Enum(cases) => {
            json!({ "enum": cases.iter().map(literal_value).collect::<Vec<_>>() })
        }
        Descriptor::Array(item) => json!({ "type": "array", "items": schema_of(item) }),
        Descriptor::Union(members) => {
            // `undefined` only says the key may be missing; `required` covers that.
            let arms = members
                .iter()
                .filter(|m| !m.is_undefined())
                .map(schema_of)
                .collect::<Vec<_>>();
            match arms.len() {
                1 => arms.into_iter().next().unwrap_or_default(),
                _ => json!({ "oneOf": arms }),
            }
        }
        Descriptor::Object(shape) => object_schema(shape),
        Descriptor::Reference(name) => json!({ "$ref": ref_path(name) }),
        Descriptor::Never => json!(false),
    }
}

fn object_schema(shape: &ObjectShape) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for prop in &shape.props {
        props.insert(prop.external.clone(), schema_of(&prop.typ));
        if !may_be_absent(&prop.typ) {
            required.push(Value::from(prop.external.clone()));
        }
    }
    let mut o = json!({ "type": "object", "properties": props });
    if !required.is_empty() {
        o["required"] = Value::Array(required);
    }
    o["additionalProperties"] = match &*shape.additional {
        Descriptor::Never => Value::Bool(false),
        Descriptor::Primitive(Primitive::Any) => Value::Bool(true),
        other => schema_of(other),
    };
    o
}

fn may_be_absent(typ: &Descriptor) -> bool {
    match typ {
        Descriptor::Primitive(Primitive::Any | Primitive::Undefined) => true,
        Descriptor::Union(members) => members.iter().any(may_be_absent),
        _ => false,
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => json_num_pref_i64(n.0),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn ref_path(name: &str) -> String {
    format!("#/definitions/{name}")
}
