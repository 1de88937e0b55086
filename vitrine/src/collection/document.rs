use im::OrdMap;
use smallvec::SmallVec;

use crate::collection::RecordId;
use crate::common::{Convertible, Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// A stored record in its native document form.
///
/// Documents are ordered maps from [String] keys to [Value]s. Nested documents are
/// addressed with dotted keys, so `doc.get("metadata.origin_address")` reads the
/// `origin_address` field of the nested `metadata` document.
///
/// The `_id` field is reserved for the record's [RecordId].
///
/// Documents use `im::OrdMap`, a persistent map: cloning is O(1) and a mutated copy
/// shares structure with the original, which keeps the store's copy-out reads cheap.
#[derive(Clone, Eq, PartialEq, Default, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates `value` with `key`, creating intermediate documents for dotted keys.
    ///
    /// # Errors
    ///
    /// * the key is empty
    /// * `_id` is set to anything other than a [Value::Id]
    /// * a dotted key crosses a field that holds a non-document value
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("name", "Lasers")?;
    /// doc.put("metadata.origin_address", "10.0.0.1")?;
    /// assert_eq!(doc.get("metadata.origin_address"), Value::from("10.0.0.1"));
    /// ```
    pub fn put<'a, T: Into<Value>>(&mut self, key: impl Into<Cow<'a, str>>, value: T) -> VitrineResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(VitrineError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        let value = value.into();
        if key == DOC_ID && !matches!(value, Value::Id(_)) {
            log::error!("Document id must be a record id, found {}", value.type_name());
            return Err(VitrineError::cast(DOC_ID, "Id"));
        }

        if key.contains(FIELD_SEPARATOR) {
            self.deep_put(&key, value)
        } else {
            self.data.insert(key.into_owned(), value);
            Ok(())
        }
    }

    /// Returns the value for `key`, or [Value::Null] when absent.
    ///
    /// Dotted keys are resolved through nested documents.
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None if key.contains(FIELD_SEPARATOR) => self.deep_get(key),
            None => Value::Null,
        }
    }

    /// Reads `key` and converts it, reporting a cast error that names the field.
    pub fn get_as<T: Convertible<Output = T>>(&self, key: &str) -> VitrineResult<T> {
        let value = self.get(key);
        T::from_value(&value).map_err(|_| {
            let expected = std::any::type_name::<T>()
                .rsplit("::")
                .next()
                .unwrap_or("value")
                .trim_end_matches('>');
            VitrineError::cast(key, expected)
        })
    }

    /// Returns the record id stored in `_id`, if any.
    pub fn id(&self) -> Option<RecordId> {
        match self.data.get(DOC_ID) {
            Some(Value::Id(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Removes `key` (dotted keys included). Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) {
        if self.data.remove(key).is_some() || !key.contains(FIELD_SEPARATOR) {
            return;
        }

        let (head, tail) = split_key(key);
        if let Some(Value::Document(mut inner)) = self.data.get(head).cloned() {
            inner.remove(tail);
            self.data.insert(head.to_string(), Value::Document(inner));
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns `true` when `field` resolves to a non-null value.
    pub fn contains_field(&self, field: &str) -> bool {
        !self.get(field).is_null()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Top-level field names, excluding `_id`.
    pub fn fields(&self) -> FieldVec {
        self.data
            .keys()
            .filter(|k| k.as_str() != DOC_ID)
            .cloned()
            .collect()
    }

    /// Copies every field of `other` into this document, overwriting on conflict.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub(crate) fn to_json(&self) -> String {
        let fields = self
            .data
            .iter()
            .map(|(k, v)| format!("\"{}\": {}", k, v.to_json()))
            .collect::<Vec<_>>();
        format!("{{{}}}", fields.join(", "))
    }

    fn deep_get(&self, key: &str) -> Value {
        let (head, tail) = split_key(key);
        match self.data.get(head) {
            Some(Value::Document(inner)) => inner.get(tail),
            _ => Value::Null,
        }
    }

    fn deep_put(&mut self, key: &str, value: Value) -> VitrineResult<()> {
        let (head, tail) = split_key(key);
        if head.is_empty() || tail.is_empty() {
            log::error!("Invalid embedded field name {}", key);
            return Err(VitrineError::new(
                &format!("Invalid embedded field name {}", key),
                ErrorKind::InvalidOperation,
            ));
        }

        let mut inner = match self.data.get(head) {
            Some(Value::Document(inner)) => inner.clone(),
            None | Some(Value::Null) => Document::new(),
            Some(other) => {
                log::error!("Field {} holds a {} and cannot be nested into", head, other.type_name());
                return Err(VitrineError::cast(head, "Document"));
            }
        };
        inner.put(tail, value)?;
        self.data.insert(head.to_string(), Value::Document(inner));
        Ok(())
    }
}

fn split_key(key: &str) -> (&str, &str) {
    match key.split_once(FIELD_SEPARATOR) {
        Some((head, tail)) => (head, tail),
        None => (key, ""),
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

/// Builds a [Document] from `key: value` pairs.
///
/// Nested documents use braces and arrays use brackets:
///
/// ```ignore
/// let doc = doc! {
///     name: "Lasers",
///     tags: ["ipl", "hair"],
///     metadata: { origin_address: "10.0.0.1" },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(stringify!($key).trim_matches('"'), $crate::doc_value!($value))
                    .expect("doc! keys are valid field names");
            )*
            doc
        }
    };
}

/// Helper macro converting values for [doc!].
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
