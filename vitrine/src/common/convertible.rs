use crate::collection::{Document, RecordId};
use crate::common::Value;
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use chrono::{DateTime, Utc};

/// Two-way conversion between a Rust type and a document [Value].
///
/// Entities implement it to map themselves to and from a [Value::Document]; the
/// primitive implementations below are what those mappings are written with
/// (see [Document::get_as]).
pub trait Convertible {
    type Output;

    fn to_value(&self) -> VitrineResult<Value>;
    fn from_value(value: &Value) -> VitrineResult<Self::Output>;
}

fn mapping_error(value: &Value, expected: &str) -> VitrineError {
    log::debug!("Value {:?} is not a {}", value, expected);
    VitrineError::new(
        &format!("Value of type {} is not a {}", value.type_name(), expected),
        ErrorKind::ObjectMappingError,
    )
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mapping_error(value, "Boolean")),
        }
    }
}

impl Convertible for i64 {
    type Output = i64;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::I64(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::I64(i) => Ok(*i),
            // integral floats are accepted, fractional ones are not
            Value::F64(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            _ => Err(mapping_error(value, "Int")),
        }
    }
}

impl Convertible for i32 {
    type Output = i32;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::I64(*self as i64))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| mapping_error(value, "Int"))
    }
}

impl Convertible for u64 {
    type Output = u64;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::from(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        let wide = i64::from_value(value)?;
        u64::try_from(wide).map_err(|_| mapping_error(value, "unsigned Int"))
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        value.as_number().ok_or_else(|| mapping_error(value, "Number"))
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mapping_error(value, "String")),
        }
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| mapping_error(value, "Date")),
            _ => Err(mapping_error(value, "Date")),
        }
    }
}

impl Convertible for RecordId {
    type Output = RecordId;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::Id(*self))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::Id(id) => Ok(*id),
            Value::String(s) => RecordId::parse(s).map_err(|_| mapping_error(value, "Id")),
            _ => Err(mapping_error(value, "Id")),
        }
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> VitrineResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        match value {
            Value::Document(doc) => Ok(doc.clone()),
            Value::Null => Ok(Document::new()),
            _ => Err(mapping_error(value, "Document")),
        }
    }
}

impl<T> Convertible for Option<T>
where
    T: Convertible<Output = T>,
{
    type Output = Option<T>;

    fn to_value(&self) -> VitrineResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> VitrineResult<Self::Output> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible<Output = T>,
{
    type Output = Vec<T>;

    fn to_value(&self) -> VitrineResult<Value> {
        let mut values = Vec::with_capacity(self.len());
        for item in self {
            values.push(item.to_value()?);
        }
        Ok(Value::Array(values))
    }

    fn from_value(value: &Value) -> VitrineResult<Self::Output> {
        match value {
            // a missing list reads as empty
            Value::Null => Ok(Vec::new()),
            Value::Array(values) => values.iter().map(T::from_value).collect(),
            _ => Err(mapping_error(value, "Array")),
        }
    }
}
