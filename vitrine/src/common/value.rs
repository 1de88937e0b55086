use crate::collection::{Document, RecordId};
use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// Compare two floats with NaN sorted after every other number.
#[inline]
fn num_cmp_float(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Represents a [Document] value. It can be a simple value like [Value::I64] or
/// [Value::String], or a complex value like [Value::Document] or [Value::Array].
///
/// The set of variants is the subset of the document store's native encoding the
/// engine needs: scalars, UTC timestamps, record identifiers, arrays and nested
/// documents.
///
/// # Characteristics
/// - **Comparable**: implements a total order. Numbers compare across `I64`/`F64`,
///   values of different types order by a fixed type rank.
/// - **Default**: defaults to `Null`
///
/// # Usage
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let doc = doc! { name: "Lasers", order: 1 };
/// ```
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Represents a null or missing value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a string value.
    String(String),
    /// Represents a UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Represents a record identifier.
    Id(RecordId),
    /// Represents an array value.
    Array(Vec<Value>),
    /// Represents a nested document.
    Document(Document),
}

impl Value {
    /// Creates a new [Value] from anything that converts into one.
    pub fn from<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    /// Converts `None` to [Value::Null] and `Some(v)` to `v.into()`.
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Value {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }

    /// Creates a [Value::Array] from a vector of convertible values.
    pub fn from_vec<T: Into<Value>>(values: Vec<T>) -> Value {
        Value::Array(values.into_iter().map(|v| v.into()).collect())
    }

    pub fn as_bool(&self) -> Option<&bool> {
        match self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&i64> {
        match self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&f64> {
        match self {
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric value as `f64` for either number variant.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_string().map(|s| s.as_str())
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&RecordId> {
        match self {
            Value::Id(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Name of the value's type as used in cast error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::I64(_) => "Int",
            Value::F64(_) => "Number",
            Value::String(_) => "String",
            Value::DateTime(_) => "Date",
            Value::Id(_) => "Id",
            Value::Array(_) => "Array",
            Value::Document(_) => "Document",
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::I64(_) | Value::F64(_) => 1,
            Value::String(_) => 2,
            Value::Document(_) => 3,
            Value::Array(_) => 4,
            Value::Id(_) => 5,
            Value::Bool(_) => 6,
            Value::DateTime(_) => 7,
        }
    }

    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }

    pub(crate) fn to_json(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::String(v) => format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::DateTime(v) => format!("\"{}\"", v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Id(v) => format!("\"{}\"", v),
            Value::Array(values) => {
                let items = values.iter().map(|v| v.to_json()).collect::<Vec<_>>();
                format!("[{}]", items.join(", "))
            }
            Value::Document(doc) => doc.to_json(),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(v) => write!(f, "{}", v),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::I64(_), Value::F64(_))
            | (Value::F64(_), Value::I64(_))
            | (Value::F64(_), Value::F64(_)) => {
                // both sides are numbers here
                let a = self.as_number().unwrap_or(f64::NAN);
                let b = other.as_number().unwrap_or(f64::NAN);
                num_cmp_float(a, b)
            }
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Id(a), Value::Id(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::I64(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::I64(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<RecordId> for Value {
    fn from(value: RecordId) -> Self {
        Value::Id(value)
    }
}

impl From<&RecordId> for Value {
    fn from(value: &RecordId) -> Self {
        Value::Id(*value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        Value::from_option(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::from_vec(value)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// Creates a [Value] from an expression.
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
