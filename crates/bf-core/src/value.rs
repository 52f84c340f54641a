use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of scalar variable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    Boolean,
    Integer,
    Float,
    #[serde(rename = "string")]
    Str,
    Object,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Object => "object",
        }
    }
}

/// Opaque handle to a host-owned object. The interpreter never inspects the
/// id beyond equality and ordering, so object collections stay sortable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub String);

impl ObjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// A concrete value of one scalar kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    #[serde(rename = "string")]
    Str(String),
    Object(Option<ObjectRef>),
}

impl Scalar {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Boolean(_) => Kind::Boolean,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Str(_) => Kind::Str,
            Self::Object(_) => Kind::Object,
        }
    }

    pub fn default_of(kind: Kind) -> Self {
        match kind {
            Kind::Boolean => Self::Boolean(false),
            Kind::Integer => Self::Integer(0),
            Kind::Float => Self::Float(0.0),
            Kind::Str => Self::Str(String::new()),
            Kind::Object => Self::Object(None),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Str(value) => write!(f, "{}", value),
            Self::Object(Some(handle)) => write!(f, "{}", handle.0),
            Self::Object(None) => write!(f, "<none>"),
        }
    }
}
