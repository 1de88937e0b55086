use crate::collection::{Document, RecordId, Update, UpdateOperation};
use crate::common::{Value, DOC_CREATED_AT, DOC_ID, DOC_UPDATED_AT};
use crate::errors::{FieldError, VitrineError, VitrineResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;

/// The value shape a schema field accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Int,
    Number,
    Bool,
    DateTime,
    Id,
    Document,
    Array(Box<FieldKind>),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "String",
            FieldKind::Int => "Int",
            FieldKind::Number => "Number",
            FieldKind::Bool => "Boolean",
            FieldKind::DateTime => "Date",
            FieldKind::Id => "Id",
            FieldKind::Document => "Document",
            FieldKind::Array(_) => "Array",
        }
    }

    /// Casts `value` to this kind, accepting the lossless conversions a document
    /// store would (integral floats to ints, id and date strings).
    fn cast(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldKind::String, Value::String(_)) => Some(value.clone()),
            (FieldKind::Int, Value::I64(_)) => Some(value.clone()),
            (FieldKind::Int, Value::F64(f)) if f.fract() == 0.0 && f.is_finite() => {
                Some(Value::I64(*f as i64))
            }
            (FieldKind::Number, Value::I64(_) | Value::F64(_)) => Some(value.clone()),
            (FieldKind::Bool, Value::Bool(_)) => Some(value.clone()),
            (FieldKind::DateTime, Value::DateTime(_)) => Some(value.clone()),
            (FieldKind::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| Value::DateTime(d.with_timezone(&Utc))),
            (FieldKind::Id, Value::Id(_)) => Some(value.clone()),
            (FieldKind::Id, Value::String(s)) => RecordId::parse(s).ok().map(Value::Id),
            (FieldKind::Document, Value::Document(_)) => Some(value.clone()),
            (FieldKind::Array(inner), Value::Array(items)) => items
                .iter()
                .map(|item| inner.cast(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        }
    }
}

/// Validation rules of one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    kind: FieldKind,
    label: Option<String>,
    required: bool,
    unique: bool,
    lowercase: bool,
    trim: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    one_of: Option<Vec<String>>,
    pattern: Option<Arc<Regex>>,
    pattern_message: Option<String>,
}

impl FieldRule {
    pub fn new(kind: FieldKind) -> Self {
        FieldRule {
            kind,
            label: None,
            required: false,
            unique: false,
            lowercase: false,
            trim: false,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
            one_of: None,
            pattern: None,
            pattern_message: None,
        }
    }

    pub fn string() -> Self {
        FieldRule::new(FieldKind::String).trim()
    }

    pub fn int() -> Self {
        FieldRule::new(FieldKind::Int)
    }

    pub fn bool() -> Self {
        FieldRule::new(FieldKind::Bool)
    }

    pub fn datetime() -> Self {
        FieldRule::new(FieldKind::DateTime)
    }

    pub fn id() -> Self {
        FieldRule::new(FieldKind::Id)
    }

    pub fn document() -> Self {
        FieldRule::new(FieldKind::Document)
    }

    pub fn array_of(kind: FieldKind) -> Self {
        FieldRule::new(FieldKind::Array(Box::new(kind)))
    }

    /// Human-readable name used in messages instead of the field path.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Backed by a unique index in the store.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Canonicalize string values to lowercase before validation and storage.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.one_of = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// String values must match `pattern`; `message` is reported otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Schemas are static definitions, so a
    /// bad pattern is a programming error.
    pub fn pattern(mut self, pattern: &str, message: &str) -> Self {
        let regex = Regex::new(pattern).unwrap_or_else(|e| panic!("invalid schema pattern {}: {}", pattern, e));
        self.pattern = Some(Arc::new(regex));
        self.pattern_message = Some(message.to_string());
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    fn display_name<'a>(&'a self, path: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(path)
    }

    /// Casts and canonicalizes a non-null value. A failed cast is a cast error.
    fn normalize(&self, path: &str, value: &Value) -> VitrineResult<Value> {
        let mut value = self
            .kind
            .cast(value)
            .ok_or_else(|| VitrineError::cast(path, self.kind.name()))?;
        if let Value::String(s) = &mut value {
            if self.trim {
                *s = s.trim().to_string();
            }
            if self.lowercase {
                *s = s.to_lowercase();
            }
        }
        Ok(value)
    }

    /// Checks the value rules, appending a [FieldError] per violated rule.
    fn check(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) {
        let name = self.display_name(path);
        if value.is_null() {
            if self.required {
                errors.push(FieldError::new(path, &format!("{} is required", name)));
            }
            return;
        }

        if let Value::String(s) = value {
            let length = s.chars().count();
            if self.required && length == 0 {
                errors.push(FieldError::new(path, &format!("{} is required", name)));
                return;
            }
            if let Some(min) = self.min_length {
                if length < min {
                    errors.push(FieldError::new(
                        path,
                        &format!("{} must be at least {} characters", name, min),
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    errors.push(FieldError::new(
                        path,
                        &format!("{} must be at most {} characters", name, max),
                    ));
                }
            }
            if let Some(allowed) = &self.one_of {
                if !allowed.iter().any(|a| a == s) {
                    errors.push(FieldError::new(
                        path,
                        &format!("{} must be one of {}", name, allowed.join(", ")),
                    ));
                }
            }
            if let Some(pattern) = &self.pattern {
                if length > 0 && !pattern.is_match(s) {
                    let message = self.pattern_message.as_deref().unwrap_or("is invalid");
                    errors.push(FieldError::new(path, &format!("{} {}", name, message)));
                }
            }
        }

        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    errors.push(FieldError::new(path, &format!("{} must be at least {}", name, min)));
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    errors.push(FieldError::new(path, &format!("{} must be at most {}", name, max)));
                }
            }
        }
    }
}

/// Field rules of one entity type.
///
/// Validation runs in two steps. Every present field is first cast to its declared
/// kind, and the first failed cast is returned as a cast error naming the field. The
/// remaining rules then run on all fields and every violation is collected into one
/// validation error whose message joins the per-field messages.
///
/// Fields without a rule are stored untouched.
///
/// # Examples
///
/// ```rust,ignore
/// let schema = Schema::new()
///     .field("name", FieldRule::string().required().max_length(100))
///     .field("slug", FieldRule::string().required().lowercase().unique())
///     .field("order", FieldRule::int().min(0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    pub fn field(mut self, path: &str, rule: FieldRule) -> Self {
        self.fields.push((path.to_string(), rule));
        self
    }

    pub fn rule(&self, path: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(p, _)| p == path).map(|(_, r)| r)
    }

    /// Paths declared unique.
    pub fn unique_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, rule)| rule.is_unique())
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Validates a full document and returns it canonicalized.
    pub fn validate_document(&self, document: &Document) -> VitrineResult<Document> {
        let mut validated = document.clone();
        for (path, rule) in &self.fields {
            let value = document.get(path);
            if !value.is_null() {
                let normalized = rule.normalize(path, &value)?;
                validated.put(path.as_str(), normalized)?;
            }
        }

        let mut errors = Vec::new();
        for (path, rule) in &self.fields {
            rule.check(path, &validated.get(path), &mut errors);
        }
        if !errors.is_empty() {
            return Err(VitrineError::validation(errors));
        }
        Ok(validated)
    }

    /// Validates the fields an update touches and returns the update canonicalized.
    ///
    /// Only patched fields are checked: setting a required field to null, or unsetting
    /// it, is a validation error; `Inc` on a field that is not numeric is a cast error.
    /// `_id`, `created_at` and `updated_at` cannot be patched.
    pub fn validate_update(&self, update: &Update) -> VitrineResult<Update> {
        let mut operations = Vec::with_capacity(update.operations().len());
        let mut errors = Vec::new();

        for operation in update.operations() {
            let path = operation.field();
            if path == DOC_ID || path == DOC_CREATED_AT || path == DOC_UPDATED_AT {
                errors.push(FieldError::new(path, &format!("{} cannot be modified", path)));
                continue;
            }

            let rule = match self.rule(path) {
                Some(rule) => rule,
                None => {
                    operations.push(operation.clone());
                    continue;
                }
            };

            let normalized = match operation {
                UpdateOperation::Set(_, value) | UpdateOperation::SetIfAbsent(_, value) => {
                    let value = if value.is_null() {
                        Value::Null
                    } else {
                        rule.normalize(path, value)?
                    };
                    rule.check(path, &value, &mut errors);
                    match operation {
                        UpdateOperation::Set(..) => UpdateOperation::Set(path.to_string(), value),
                        _ => UpdateOperation::SetIfAbsent(path.to_string(), value),
                    }
                }
                UpdateOperation::Unset(_) => {
                    rule.check(path, &Value::Null, &mut errors);
                    operation.clone()
                }
                UpdateOperation::Inc(_, amount) => {
                    if !matches!(rule.kind(), FieldKind::Int | FieldKind::Number) || !amount.is_number() {
                        return Err(VitrineError::cast(path, "Number"));
                    }
                    operation.clone()
                }
                UpdateOperation::Pull(_, value) | UpdateOperation::AddToSet(_, value) => {
                    let inner = match rule.kind() {
                        FieldKind::Array(inner) => inner,
                        _ => return Err(VitrineError::cast(path, "Array")),
                    };
                    let value = inner
                        .cast(value)
                        .ok_or_else(|| VitrineError::cast(path, inner.name()))?;
                    match operation {
                        UpdateOperation::Pull(..) => UpdateOperation::Pull(path.to_string(), value),
                        _ => UpdateOperation::AddToSet(path.to_string(), value),
                    }
                }
            };
            operations.push(normalized);
        }

        if !errors.is_empty() {
            return Err(VitrineError::validation(errors));
        }
        Ok(Update::from_operations(operations))
    }
}
