//! Named descriptors and the conversion entry points.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::transform::{Direction, Transformer};
use crate::value::TypedValue;

/// Mapping from type name to descriptor. Built once, then only read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    types: IndexMap<String, Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, typ: Descriptor) -> Self {
        self.insert(name, typ);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, typ: Descriptor) -> Option<Descriptor> {
        self.types.insert(name.into(), typ)
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.types.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&Descriptor> {
        self.types.get(name).ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check structural invariants of every registered descriptor.
    /// Unknown reference targets are left to conversion time, but a chain of
    /// bare aliases that loops back on itself is rejected here.
    pub fn check(&self) -> Result<()> {
        for (name, typ) in &self.types {
            typ.check().map_err(|e| match e {
                Error::InvalidDescriptor(msg) => Error::InvalidDescriptor(format!("{name}: {msg}")),
                other => other,
            })?;
            self.follow_aliases(name)?;
        }
        Ok(())
    }

    /// Walk `name` through reference-only descriptors until something else
    /// (or an unregistered name) is reached.
    pub(crate) fn follow_aliases<'a>(&'a self, name: &'a str) -> Result<Option<&'a Descriptor>> {
        let mut chain = vec![name];
        let mut current = name;
        loop {
            match self.types.get(current) {
                None => return Ok(None),
                Some(Descriptor::Reference(next)) => {
                    if chain.contains(&next.as_str()) {
                        chain.push(next.as_str());
                        return Err(Error::InvalidDescriptor(format!(
                            "reference cycle {}",
                            chain.join(" → ")
                        )));
                    }
                    chain.push(next.as_str());
                    current = next.as_str();
                }
                Some(other) => return Ok(Some(other)),
            }
        }
    }

    /// Load a registry from its JSON representation and check it.
    pub fn from_json_str(src: &str) -> Result<Self> {
        let registry: Self = crate::path_de::from_str_with_path(src)?;
        registry.check()?;
        Ok(registry)
    }

    /// JSON → typed value.
    pub fn cast(&self, val: &serde_json::Value, typ: &Descriptor) -> Result<TypedValue> {
        Transformer::new(self, Direction::Decode).run(&TypedValue::from_json(val), typ)
    }

    /// Typed value → JSON.
    pub fn uncast(&self, val: &TypedValue, typ: &Descriptor) -> Result<serde_json::Value> {
        let out = Transformer::new(self, Direction::Encode).run(val, typ)?;
        Ok(out.to_json())
    }

    /// Parse JSON text and decode it against the named type.
    pub fn decode(&self, json: &str, name: &str) -> Result<TypedValue> {
        let val: serde_json::Value = serde_json::from_str(json)?;
        self.cast(&val, &Descriptor::reference(name))
    }

    /// Encode against the named type and render pretty JSON text.
    pub fn encode(&self, val: &TypedValue, name: &str) -> Result<String> {
        let out = self.uncast(val, &Descriptor::reference(name))?;
        Ok(serde_json::to_string_pretty(&out)?)
    }
}
