use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A value did not conform to its descriptor. Carries everything the
    /// message needs, already rendered for display.
    #[error("Invalid value{}{}. Expected {expected} but got {actual}", key_text(.key), parent_text(.parent))]
    ShapeMismatch {
        key: Option<String>,
        parent: Option<String>,
        expected: String,
        actual: String,
    },

    #[error("unknown type `{0}` in registry")]
    UnknownType(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Mapping a JSON document onto a Rust type failed.
    #[error("at JSON path {path} → {message}")]
    Deserialize { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Error::ShapeMismatch { .. })
    }

    /// The offending property key, when the mismatch happened inside an object.
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::ShapeMismatch { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

fn key_text(key: &Option<String>) -> String {
    match key {
        Some(k) => format!(" for key \"{k}\""),
        None => String::new(),
    }
}

fn parent_text(parent: &Option<String>) -> String {
    match parent {
        Some(p) => format!(" on {p}"),
        None => String::new(),
    }
}
