//! Recursive descent over a descriptor tree, shared by decode and encode.
//!
//! The two directions differ only in which renaming table drives objects:
//! decode reads external keys and writes internal ones, encode the reverse.
//! A missing property is `None` all the way through, so `Undefined` and
//! `Any` can accept it and everything else reports it as `undefined`.
use indexmap::IndexMap;

use crate::descriptor::{Descriptor, ObjectShape, Primitive};
use crate::error::{Error, Result};
use crate::naming::pretty_type_name;
use crate::registry::Registry;
use crate::value::{parse_timestamp, TypedValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// JSON → typed value
    Decode,
    /// typed value → JSON
    Encode,
}

pub(crate) struct Transformer<'r> {
    registry: &'r Registry,
    direction: Direction,
}

/// Where a value sits, for error messages.
#[derive(Clone, Copy, Default)]
struct Site<'a> {
    key: Option<&'a str>,
    parent: Option<&'a str>,
}

impl<'r> Transformer<'r> {
    pub(crate) fn new(registry: &'r Registry, direction: Direction) -> Self {
        Self { registry, direction }
    }

    pub(crate) fn run(&self, val: &TypedValue, typ: &Descriptor) -> Result<TypedValue> {
        let out = self.transform(Some(val), typ, Site::default())?;
        Ok(out.unwrap_or(TypedValue::Null))
    }

    fn transform(
        &self,
        val: Option<&TypedValue>,
        typ: &Descriptor,
        site: Site<'_>,
    ) -> Result<Option<TypedValue>> {
        let mut typ = typ;
        let mut reference: Option<&str> = None;
        let mut hops = 0;
        while let Descriptor::Reference(name) = typ {
            // More hops than registered names means the aliases loop.
            if hops > self.registry.len() {
                self.registry.follow_aliases(name)?;
            }
            hops += 1;
            reference = Some(name.as_str());
            typ = self.registry.resolve(name)?;
        }

        match typ {
            Descriptor::Primitive(p) => {
                if admits(*p, val) {
                    Ok(val.cloned())
                } else {
                    Err(mismatch(pretty_type_name(typ), val, site))
                }
            }
            Descriptor::Never => Err(mismatch(pretty_type_name(typ), val, site)),
            Descriptor::Enum(cases) => match val {
                Some(v) if cases.iter().any(|c| c.matches(v)) => Ok(Some(v.clone())),
                _ => Err(mismatch(pretty_type_name(typ), val, site)),
            },
            Descriptor::Union(members) => {
                for member in members {
                    match self.transform(val, member, Site::default()) {
                        Ok(out) => return Ok(out),
                        Err(Error::ShapeMismatch { .. }) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Err(mismatch(pretty_type_name(typ), val, site))
            }
            Descriptor::Array(item) => match val {
                Some(TypedValue::Array(xs)) => {
                    let mut out = Vec::with_capacity(xs.len());
                    for el in xs {
                        let el = self.transform(Some(el), item, Site::default())?;
                        out.push(el.unwrap_or(TypedValue::Null));
                    }
                    Ok(Some(TypedValue::Array(out)))
                }
                _ => Err(mismatch("array".to_string(), val, site)),
            },
            Descriptor::Object(shape) => self.transform_object(shape, reference, val, site),
            Descriptor::Date => transform_date(val, site),
            Descriptor::Reference(name) => Err(Error::UnknownType(name.clone())),
        }
    }

    fn transform_object(
        &self,
        shape: &ObjectShape,
        reference: Option<&str>,
        val: Option<&TypedValue>,
        site: Site<'_>,
    ) -> Result<Option<TypedValue>> {
        let Some(TypedValue::Object(map)) = val else {
            let expected = reference.unwrap_or("object").to_string();
            return Err(mismatch(expected, val, site));
        };

        let tables = shape.tables();
        let table = match self.direction {
            Direction::Decode => &tables.decode,
            Direction::Encode => &tables.encode,
        };

        let mut result = IndexMap::with_capacity(map.len());
        for (source, target) in table {
            let prop = &shape.props[target.index];
            let inner = Site { key: Some(source.as_str()), parent: reference };
            if let Some(v) = self.transform(map.get(source), &prop.typ, inner)? {
                result.insert(target.name.clone(), v);
            }
        }
        for (key, v) in map {
            if table.contains_key(key) {
                continue;
            }
            let inner = Site { key: Some(key.as_str()), parent: reference };
            let out = self.transform(Some(v), &shape.additional, inner)?;
            result.insert(key.clone(), out.unwrap_or(TypedValue::Null));
        }
        Ok(Some(TypedValue::Object(result)))
    }
}

fn admits(p: Primitive, val: Option<&TypedValue>) -> bool {
    match (p, val) {
        (Primitive::Any, _) => true,
        (Primitive::Undefined, None) => true,
        (Primitive::Null, Some(TypedValue::Null)) => true,
        (Primitive::String, Some(TypedValue::String(_))) => true,
        (Primitive::Number, Some(TypedValue::Number(_))) => true,
        (Primitive::Boolean, Some(TypedValue::Bool(_))) => true,
        _ => false,
    }
}

/// Numbers are rejected even though they could be read as epoch offsets.
fn transform_date(val: Option<&TypedValue>, site: Site<'_>) -> Result<Option<TypedValue>> {
    match val {
        Some(TypedValue::Null) => Ok(Some(TypedValue::Null)),
        Some(TypedValue::Date(d)) => Ok(Some(TypedValue::Date(*d))),
        Some(TypedValue::String(s)) => match parse_timestamp(s) {
            Some(d) => Ok(Some(TypedValue::Date(d))),
            None => Err(mismatch("Date".to_string(), val, site)),
        },
        _ => Err(mismatch("Date".to_string(), val, site)),
    }
}

fn mismatch(expected: String, val: Option<&TypedValue>, site: Site<'_>) -> Error {
    Error::ShapeMismatch {
        key: site.key.map(str::to_string),
        parent: site.parent.map(str::to_string),
        expected,
        actual: match val {
            Some(v) => v.to_string(),
            None => "undefined".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Property;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new()
            .with(
                "Person",
                Descriptor::closed_object(vec![
                    Property::new("full_name", "fullName", Descriptor::string()),
                    Property::same("age", Descriptor::number()),
                    Property::new("born_at", "bornAt", Descriptor::date()),
                    Property::same("nickname", Descriptor::optional(Descriptor::string())),
                    Property::same("friends", Descriptor::array(Descriptor::reference("Person"))),
                ]),
            )
            .with("Tags", Descriptor::map(Descriptor::string()))
            .with("Loose", Descriptor::object(
                vec![Property::new("a", "alpha", Descriptor::number())],
                Descriptor::any(),
            ))
    }

    fn decode(reg: &Registry, v: serde_json::Value, typ: Descriptor) -> Result<TypedValue> {
        reg.cast(&v, &typ)
    }

    #[test]
    fn decode_renames_and_parses_dates() {
        let reg = registry();
        let out = decode(&reg, json!({
            "full_name": "Ada", "age": 36, "born_at": "1815-12-10T00:00:00Z", "friends": []
        }), Descriptor::reference("Person")).unwrap();
        assert_eq!(out.get("fullName"), Some(&TypedValue::String("Ada".into())));
        assert!(out.get("full_name").is_none());
        assert!(out.get("bornAt").and_then(TypedValue::as_date).is_some());
        // optional and missing: no key at all
        assert!(out.get("nickname").is_none());
    }

    #[test]
    fn encode_restores_external_names() {
        let reg = registry();
        let input = json!({
            "full_name": "Ada", "age": 36, "born_at": "1815-12-10T00:00:00.000Z",
            "nickname": "countess", "friends": []
        });
        let typed = reg.cast(&input, &Descriptor::reference("Person")).unwrap();
        let back = reg.uncast(&typed, &Descriptor::reference("Person")).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn recursive_references_terminate_on_finite_input() {
        let reg = registry();
        let input = json!({
            "full_name": "A", "age": 1, "born_at": null,
            "friends": [{ "full_name": "B", "age": 2, "born_at": null, "friends": [] }]
        });
        let out = reg.cast(&input, &Descriptor::reference("Person")).unwrap();
        let friends = out.get("friends").unwrap();
        let TypedValue::Array(xs) = friends else { panic!("expected array") };
        assert_eq!(xs[0].get("fullName"), Some(&TypedValue::String("B".into())));
    }

    #[test]
    fn nested_error_names_key_and_parent() {
        let reg = registry();
        let input = json!({
            "full_name": "A", "age": 1, "born_at": null,
            "friends": [{ "full_name": 7, "age": 2, "born_at": null, "friends": [] }]
        });
        let err = reg.cast(&input, &Descriptor::reference("Person")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for key \"full_name\" on Person. Expected string but got 7"
        );
    }

    #[test]
    fn missing_required_property_reports_undefined() {
        let reg = registry();
        let err = decode(&reg, json!({ "full_name": "A", "born_at": null, "friends": [] }),
            Descriptor::reference("Person")).unwrap_err();
        assert_eq!(err.key(), Some("age"));
        assert!(err.to_string().ends_with("Expected number but got undefined"));
    }

    #[test]
    fn closed_object_rejects_extra_keys() {
        let reg = registry();
        let err = decode(&reg, json!({
            "full_name": "A", "age": 1, "born_at": null, "friends": [], "extra": 1
        }), Descriptor::reference("Person")).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(err.key(), Some("extra"));
    }

    #[test]
    fn open_object_passes_extra_keys_through() {
        let reg = registry();
        let out = decode(&reg, json!({ "a": 1, "b": [1, "x"] }), Descriptor::reference("Loose")).unwrap();
        assert_eq!(out.to_json(), json!({ "alpha": 1, "b": [1, "x"] }));
    }

    #[test]
    fn map_validates_every_value() {
        let reg = registry();
        let ok = decode(&reg, json!({ "x": "1", "y": "2" }), Descriptor::reference("Tags")).unwrap();
        assert_eq!(ok.to_json(), json!({ "x": "1", "y": "2" }));
        let err = decode(&reg, json!({ "x": "1", "y": 2 }), Descriptor::reference("Tags")).unwrap_err();
        assert_eq!(err.key(), Some("y"));
    }

    #[test]
    fn object_descriptor_rejects_non_objects() {
        let reg = registry();
        for v in [json!(null), json!([]), json!("x"), json!(1)] {
            let err = decode(&reg, v, Descriptor::reference("Tags")).unwrap_err();
            assert!(err.to_string().contains("Expected Tags"), "{err}");
        }
        let err = decode(&reg, json!(1), Descriptor::map(Descriptor::any())).unwrap_err();
        assert!(err.to_string().contains("Expected object"));
    }

    #[test]
    fn arrays() {
        let reg = Registry::new();
        let typ = Descriptor::array(Descriptor::number());
        assert_eq!(reg.cast(&json!([]), &typ).unwrap(), TypedValue::Array(vec![]));
        assert_eq!(reg.cast(&json!([1, 2]), &typ).unwrap().to_json(), json!([1, 2]));
        let err = reg.cast(&json!({"0": 1}), &typ).unwrap_err();
        assert!(err.to_string().contains("Expected array"));
        let err = reg.cast(&json!([1, "2"]), &typ).unwrap_err();
        assert_eq!(err.key(), None);
    }

    #[test]
    fn union_tries_candidates_in_order() {
        let reg = Registry::new();
        let typ = Descriptor::union(vec![
            Descriptor::number(),
            Descriptor::boolean(),
            Descriptor::array(Descriptor::string()),
        ]);
        assert_eq!(reg.cast(&json!(["a"]), &typ).unwrap().to_json(), json!(["a"]));
        let err = reg.cast(&json!("a"), &typ).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value. Expected one of [number, boolean, array] but got \"a\""
        );
    }

    #[test]
    fn union_first_success_wins() {
        let reg = Registry::new();
        // a date-typed candidate listed first claims timestamp text
        let typ = Descriptor::union(vec![Descriptor::date(), Descriptor::string()]);
        assert!(reg.cast(&json!("2020-01-01"), &typ).unwrap().as_date().is_some());
        let typ = Descriptor::union(vec![Descriptor::string(), Descriptor::date()]);
        assert_eq!(reg.cast(&json!("2020-01-01"), &typ).unwrap(), TypedValue::String("2020-01-01".into()));
    }

    #[test]
    fn union_propagates_unknown_type() {
        let reg = Registry::new();
        let typ = Descriptor::union(vec![Descriptor::reference("Missing"), Descriptor::string()]);
        assert!(matches!(reg.cast(&json!("x"), &typ), Err(Error::UnknownType(n)) if n == "Missing"));
    }

    #[test]
    fn enums() {
        let reg = Registry::new();
        let typ = Descriptor::enumeration(["public", "private"]);
        assert!(reg.cast(&json!("public"), &typ).is_ok());
        let err = reg.cast(&json!("internal"), &typ).unwrap_err();
        assert!(err.to_string().contains("Expected one of [public, private]"));
    }

    #[test]
    fn primitives_match_by_kind() {
        let reg = Registry::new();
        assert!(reg.cast(&json!(""), &Descriptor::string()).is_ok());
        assert!(reg.cast(&json!(1.5), &Descriptor::number()).is_ok());
        assert!(reg.cast(&json!(false), &Descriptor::boolean()).is_ok());
        assert!(reg.cast(&json!(null), &Descriptor::null()).is_ok());
        assert!(reg.cast(&json!({"x": [1]}), &Descriptor::any()).is_ok());
        assert!(reg.cast(&json!("1"), &Descriptor::number()).is_err());
        assert!(reg.cast(&json!(0), &Descriptor::boolean()).is_err());
        assert!(reg.cast(&json!(null), &Descriptor::string()).is_err());
        assert!(reg.cast(&json!("null"), &Descriptor::null()).is_err());
        assert!(reg.cast(&json!(1), &Descriptor::Never).is_err());
    }

    #[test]
    fn dates() {
        let reg = Registry::new();
        assert_eq!(reg.cast(&json!(null), &Descriptor::date()).unwrap(), TypedValue::Null);
        let err = reg.cast(&json!(1577836800), &Descriptor::date()).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert!(reg.cast(&json!("yesterday"), &Descriptor::date()).is_err());
        assert!(reg.cast(&json!(true), &Descriptor::date()).is_err());
    }

    #[test]
    fn encode_rejects_dates_under_string_descriptor() {
        let reg = Registry::new();
        let typed = reg.cast(&json!("2020-01-01T00:00:00Z"), &Descriptor::date()).unwrap();
        assert!(reg.uncast(&typed, &Descriptor::string()).is_err());
        assert_eq!(reg.uncast(&typed, &Descriptor::date()).unwrap(), json!("2020-01-01T00:00:00.000Z"));
    }

    #[test]
    fn encode_routes_additional_properties_through_encode_direction() {
        let reg = Registry::new().with(
            "Inner",
            Descriptor::closed_object(vec![Property::new("ext", "int", Descriptor::number())]),
        );
        let typ = Descriptor::map(Descriptor::reference("Inner"));
        let typed = reg.cast(&json!({ "k": { "ext": 1 } }), &typ).unwrap();
        assert_eq!(typed.to_json(), json!({ "k": { "int": 1 } }));
        let back = reg.uncast(&typed, &typ).unwrap();
        assert_eq!(back, json!({ "k": { "ext": 1 } }));
    }
}
