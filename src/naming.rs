//! Display names for descriptors, used only in mismatch messages.
use crate::descriptor::{Descriptor, Literal, Primitive};

pub fn pretty_type_name(typ: &Descriptor) -> String {
    match typ {
        Descriptor::Union(members) if members.len() == 2 && members[0].is_undefined() => {
            format!("an optional {}", pretty_type_name(&members[1]))
        }
        Descriptor::Union(members) => one_of(members.iter().map(pretty_type_name)),
        Descriptor::Enum(cases) => one_of(cases.iter().map(Literal::to_string)),
        Descriptor::Reference(name) => name.clone(),
        Descriptor::Primitive(p) => primitive_name(*p).to_string(),
        Descriptor::Date => "Date".to_string(),
        Descriptor::Array(_) => "array".to_string(),
        Descriptor::Object(_) => "object".to_string(),
        Descriptor::Never => "never".to_string(),
    }
}

pub fn primitive_name(p: Primitive) -> &'static str {
    match p {
        Primitive::String => "string",
        Primitive::Number => "number",
        Primitive::Boolean => "boolean",
        Primitive::Null => "null",
        Primitive::Any => "any",
        Primitive::Undefined => "undefined",
    }
}

fn one_of(names: impl Iterator<Item = String>) -> String {
    format!("one of [{}]", names.collect::<Vec<_>>().join(", "))
}
