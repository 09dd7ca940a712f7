//! Type descriptors: the closed set of shapes the converter understands.
use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::TypedValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Descriptor {
    Primitive(Primitive),
    /// A point in time. `null` is let through as well.
    Date,
    /// Closed set of scalar literals.
    Enum(Vec<Literal>),
    Array(Box<Descriptor>),
    /// Ordered candidates, first match wins.
    Union(Vec<Descriptor>),
    Object(ObjectShape),
    /// Named type, looked up in the registry at conversion time.
    #[serde(rename = "ref")]
    Reference(String),
    /// Matches nothing. Used as the closed additional-properties policy.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Null,
    Any,
    /// The absent marker: only a missing property matches.
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// Key in raw JSON.
    pub external: String,
    /// Key in the typed value.
    pub internal: String,
    pub typ: Descriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectShape {
    pub props: Vec<Property>,
    pub additional: Box<Descriptor>,
    #[serde(skip)]
    tables: OnceCell<RenameTables>,
}

/// Both renaming directions, derived from one property list.
#[derive(Debug, Clone, Default)]
pub struct RenameTables {
    /// external key → internal target
    pub decode: IndexMap<String, Target>,
    /// internal key → external target
    pub encode: IndexMap<String, Target>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    /// Index into `ObjectShape::props`.
    pub index: usize,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Descriptor {
    pub fn string() -> Self { Descriptor::Primitive(Primitive::String) }
    pub fn number() -> Self { Descriptor::Primitive(Primitive::Number) }
    pub fn boolean() -> Self { Descriptor::Primitive(Primitive::Boolean) }
    pub fn null() -> Self { Descriptor::Primitive(Primitive::Null) }
    pub fn any() -> Self { Descriptor::Primitive(Primitive::Any) }
    pub fn undefined() -> Self { Descriptor::Primitive(Primitive::Undefined) }
    pub fn date() -> Self { Descriptor::Date }

    pub fn enumeration<I, L>(cases: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Descriptor::Enum(cases.into_iter().map(Into::into).collect())
    }

    pub fn array(item: Descriptor) -> Self {
        Descriptor::Array(Box::new(item))
    }

    pub fn union(members: Vec<Descriptor>) -> Self {
        Descriptor::Union(members)
    }

    /// `undefined | inner`: the property may be missing.
    pub fn optional(inner: Descriptor) -> Self {
        Descriptor::Union(vec![Descriptor::undefined(), inner])
    }

    pub fn object(props: Vec<Property>, additional: Descriptor) -> Self {
        Descriptor::Object(ObjectShape::new(props, additional))
    }

    /// Object that rejects any key not listed in `props`.
    pub fn closed_object(props: Vec<Property>) -> Self {
        Self::object(props, Descriptor::Never)
    }

    /// Map with arbitrary keys whose values all follow `additional`.
    pub fn map(additional: Descriptor) -> Self {
        Self::object(Vec::new(), additional)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Descriptor::Reference(name.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Descriptor::Primitive(Primitive::Undefined))
    }

    /// Check the structural invariants of this descriptor tree. References
    /// are not followed.
    pub fn check(&self) -> Result<()> {
        match self {
            Descriptor::Primitive(_) | Descriptor::Date | Descriptor::Never | Descriptor::Reference(_) => Ok(()),
            Descriptor::Enum(cases) => {
                if cases.is_empty() {
                    return Err(Error::InvalidDescriptor("enum with no cases".into()));
                }
                Ok(())
            }
            Descriptor::Array(item) => item.check(),
            Descriptor::Union(members) => {
                if members.is_empty() {
                    return Err(Error::InvalidDescriptor("union with no members".into()));
                }
                members.iter().try_for_each(Descriptor::check)
            }
            Descriptor::Object(shape) => shape.check(),
        }
    }
}

impl Property {
    pub fn new(external: impl Into<String>, internal: impl Into<String>, typ: Descriptor) -> Self {
        Self { external: external.into(), internal: internal.into(), typ }
    }

    /// Same key on both sides.
    pub fn same(name: impl Into<String>, typ: Descriptor) -> Self {
        let name = name.into();
        Self { external: name.clone(), internal: name, typ }
    }
}

impl ObjectShape {
    pub fn new(props: Vec<Property>, additional: Descriptor) -> Self {
        Self { props, additional: Box::new(additional), tables: OnceCell::new() }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.additional, Descriptor::Never)
    }

    /// Renaming tables, built on first use.
    pub fn tables(&self) -> &RenameTables {
        self.tables.get_or_init(|| RenameTables::build(&self.props))
    }

    fn check(&self) -> Result<()> {
        let mut external = HashSet::new();
        let mut internal = HashSet::new();
        for prop in &self.props {
            if !external.insert(prop.external.as_str()) {
                return Err(Error::InvalidDescriptor(format!(
                    "duplicate external property name `{}`",
                    prop.external
                )));
            }
            if !internal.insert(prop.internal.as_str()) {
                return Err(Error::InvalidDescriptor(format!(
                    "duplicate internal property name `{}`",
                    prop.internal
                )));
            }
            prop.typ.check()?;
        }
        self.additional.check()
    }
}

impl RenameTables {
    fn build(props: &[Property]) -> Self {
        let mut out = Self::default();
        for (index, prop) in props.iter().enumerate() {
            out.decode.insert(prop.external.clone(), Target { name: prop.internal.clone(), index });
            out.encode.insert(prop.internal.clone(), Target { name: prop.external.clone(), index });
        }
        out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LITERALS
// ————————————————————————————————————————————————————————————————————————————

impl Literal {
    /// Membership by value; numbers compare numerically.
    pub fn matches(&self, value: &TypedValue) -> bool {
        match (self, value) {
            (Literal::Bool(a), TypedValue::Bool(b)) => a == b,
            (Literal::Number(a), TypedValue::Number(b)) => b.as_f64() == Some(a.0),
            (Literal::String(a), TypedValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_string()) }
}

impl From<String> for Literal {
    fn from(s: String) -> Self { Literal::String(s) }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self { Literal::Number(OrderedFloat(n)) }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self { Literal::Number(OrderedFloat(n as f64)) }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Number(n) => write!(f, "{}", n.0),
            Literal::String(s) => f.write_str(s),
        }
    }
}
