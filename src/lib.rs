//! Schema-driven JSON conversion for repository listings.
//!
//! A [`Registry`] maps type names to [`Descriptor`]s. Decoding (`cast`) walks
//! a JSON value against a descriptor, renaming properties from external to
//! internal names and turning timestamp text into dates; encoding (`uncast`)
//! walks the same tree the other way. The first mismatch aborts the call with
//! [`Error::ShapeMismatch`].
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod jq_exec;
pub mod naming;
pub mod path_de;
pub mod registry;
pub mod repo;
pub mod schema;
pub mod transform;
pub mod value;

pub use descriptor::{Descriptor, Literal, ObjectShape, Primitive, Property};
pub use error::{Error, Result};
pub use registry::Registry;
pub use repo::{Convert, License, Owner, Permissions, Repo};
pub use transform::Direction;
pub use value::TypedValue;
