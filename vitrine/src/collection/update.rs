use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use std::fmt::Display;

/// One field-level mutation inside an [Update].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Set the field to a value.
    Set(String, Value),
    /// Set the field only when it is currently null or missing.
    SetIfAbsent(String, Value),
    /// Remove the field.
    Unset(String),
    /// Add a number to the field, treating a missing field as zero.
    Inc(String, Value),
    /// Remove every occurrence of a value from an array field.
    Pull(String, Value),
    /// Append a value to an array field unless it is already present.
    AddToSet(String, Value),
}

impl UpdateOperation {
    pub fn field(&self) -> &str {
        match self {
            UpdateOperation::Set(f, _)
            | UpdateOperation::SetIfAbsent(f, _)
            | UpdateOperation::Unset(f)
            | UpdateOperation::Inc(f, _)
            | UpdateOperation::Pull(f, _)
            | UpdateOperation::AddToSet(f, _) => f,
        }
    }
}

/// A patch applied atomically to a single document by the store.
///
/// Updates are field-level operations, never whole-document replacements, so the
/// engine does not have to read a record before changing it. Every operation is
/// idempotent except [UpdateOperation::Inc].
///
/// # Examples
///
/// ```rust,ignore
/// let update = Update::new()
///     .set("publish_state", "published")
///     .set_if_absent("first_published_at", now());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operations: Vec<UpdateOperation>,
}

impl Update {
    pub fn new() -> Self {
        Update {
            operations: Vec::new(),
        }
    }

    pub fn from_operations(operations: Vec<UpdateOperation>) -> Self {
        Update { operations }
    }

    /// Builds an update setting every top-level field of `document` except `_id`.
    pub fn from_document(document: &Document) -> Self {
        let mut update = Update::new();
        for (key, value) in document.iter() {
            if key != DOC_ID {
                update = update.set(key, value.clone());
            }
        }
        update
    }

    pub fn set<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations
            .push(UpdateOperation::Set(field.to_string(), value.into()));
        self
    }

    pub fn set_if_absent<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations
            .push(UpdateOperation::SetIfAbsent(field.to_string(), value.into()));
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.operations.push(UpdateOperation::Unset(field.to_string()));
        self
    }

    pub fn inc<T: Into<Value>>(mut self, field: &str, amount: T) -> Self {
        self.operations
            .push(UpdateOperation::Inc(field.to_string(), amount.into()));
        self
    }

    pub fn pull<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations
            .push(UpdateOperation::Pull(field.to_string(), value.into()));
        self
    }

    pub fn add_to_set<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations
            .push(UpdateOperation::AddToSet(field.to_string(), value.into()));
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns `true` when the update touches `field`.
    pub fn touches(&self, field: &str) -> bool {
        self.operations.iter().any(|op| op.field() == field)
    }

    /// Applies every operation to `document` in order.
    ///
    /// Returns `true` when the document changed.
    pub fn apply(&self, document: &mut Document) -> VitrineResult<bool> {
        let before = document.clone();
        for operation in &self.operations {
            if operation.field() == DOC_ID {
                log::error!("Record id cannot be updated");
                return Err(VitrineError::new(
                    "Record id cannot be updated",
                    ErrorKind::InvalidOperation,
                ));
            }

            match operation {
                UpdateOperation::Set(field, value) => document.put(field.as_str(), value.clone())?,
                UpdateOperation::SetIfAbsent(field, value) => {
                    if document.get(field).is_null() {
                        document.put(field.as_str(), value.clone())?;
                    }
                }
                UpdateOperation::Unset(field) => document.remove(field),
                UpdateOperation::Inc(field, amount) => {
                    let current = document.get(field);
                    let next = increment(field, &current, amount)?;
                    document.put(field.as_str(), next)?;
                }
                UpdateOperation::Pull(field, value) => match document.get(field) {
                    Value::Array(items) => {
                        let kept: Vec<Value> = items.into_iter().filter(|v| v != value).collect();
                        document.put(field.as_str(), Value::Array(kept))?;
                    }
                    // pulling from a missing field is a no-op
                    Value::Null => {}
                    other => {
                        log::error!("Cannot pull from non-array field {} ({})", field, other.type_name());
                        return Err(VitrineError::cast(field, "Array"));
                    }
                },
                UpdateOperation::AddToSet(field, value) => match document.get(field) {
                    Value::Array(mut items) => {
                        if !items.contains(value) {
                            items.push(value.clone());
                            document.put(field.as_str(), Value::Array(items))?;
                        }
                    }
                    Value::Null => document.put(field.as_str(), Value::Array(vec![value.clone()]))?,
                    other => {
                        log::error!("Cannot add to non-array field {} ({})", field, other.type_name());
                        return Err(VitrineError::cast(field, "Array"));
                    }
                },
            }
        }
        Ok(*document != before)
    }
}

fn increment(field: &str, current: &Value, amount: &Value) -> VitrineResult<Value> {
    match (current, amount) {
        (Value::Null, Value::I64(b)) => Ok(Value::I64(*b)),
        (Value::Null, Value::F64(b)) => Ok(Value::F64(*b)),
        (Value::I64(a), Value::I64(b)) => Ok(Value::I64(a.saturating_add(*b))),
        (Value::I64(_), Value::F64(_)) | (Value::F64(_), Value::I64(_)) | (Value::F64(_), Value::F64(_)) => {
            let a = current.as_number().unwrap_or_default();
            let b = amount.as_number().unwrap_or_default();
            Ok(Value::F64(a + b))
        }
        _ => {
            log::error!("Cannot increment field {} of type {}", field, current.type_name());
            Err(VitrineError::cast(field, "Number"))
        }
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ops = self
            .operations
            .iter()
            .map(|op| match op {
                UpdateOperation::Set(k, v) => format!("$set {}={:?}", k, v),
                UpdateOperation::SetIfAbsent(k, v) => format!("$setIfAbsent {}={:?}", k, v),
                UpdateOperation::Unset(k) => format!("$unset {}", k),
                UpdateOperation::Inc(k, v) => format!("$inc {}+={:?}", k, v),
                UpdateOperation::Pull(k, v) => format!("$pull {}:{:?}", k, v),
                UpdateOperation::AddToSet(k, v) => format!("$addToSet {}:{:?}", k, v),
            })
            .collect::<Vec<_>>();
        write!(f, "[{}]", ops.join(", "))
    }
}
