use derive_more::Display;
use internment::Intern;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub use event::DynamicEvent;

pub mod event;

/// Interned field name.
///
/// Interned names are never freed, so names should come from a fixed set
/// rather than from arbitrary input.
pub type FieldName = Intern<String>;

/// Seconds since the Unix epoch
pub type Timestamp = i64;

pub const TIME: &str = "time";
pub const SESSION_ID: &str = "session_id";
pub const USER: &str = "user";
pub const HOST: &str = "host";
pub const OS: &str = "os";
pub const OS_VERSION: &str = "osver";
pub const EDEN_VERSION: &str = "edenver";
pub const LOGGED_BY: &str = "logged_by";
pub const SYSTEM_ARCHITECTURE: &str = "system_architecture";
pub const TYPE: &str = "type";

/// Field names the logger injects into every event.
/// Events must not define fields with these names.
pub const RESERVED_FIELD_NAMES: [&str; 10] = [
    TIME,
    SESSION_ID,
    USER,
    HOST,
    OS,
    OS_VERSION,
    EDEN_VERSION,
    LOGGED_BY,
    SYSTEM_ARCHITECTURE,
    TYPE,
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELD_NAMES.contains(&name)
}

/// One of the two top-level groupings of an emitted event line.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[display("int")]
    Int,
    #[display("normal")]
    Normal,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Int, Bucket::Normal];
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Double(OrderedFloat<f64>),
    #[display("{_0}")]
    String(String),
    #[display("{_0}")]
    Bool(bool),
}

impl FieldValue {
    /// Numeric kinds land in the `int` bucket, everything else in `normal`.
    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Int(_) | Self::Double(_) => Bucket::Int,
            Self::String(_) | Self::Bool(_) => Bucket::Normal,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        match self {
            Self::Double(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<i8> for FieldValue {
    fn from(v: i8) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_owned())
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Double(OrderedFloat(v.into()))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(OrderedFloat(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}
