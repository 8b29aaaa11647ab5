//! # Model Settings
//!
//! Per-model settings persisted in a single JSON column holding a flat key → value object.
//! Setting keys are an application enum implementing [`SettingKey`]; every key declares its
//! type, default, optional validator and optional request path in a [`SettingDefinition`].
//! Values are coerced to the declared type on read and on write.
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum UserSetting {
//!     Newsletter,
//!     PageSize,
//!     Theme,
//! }
//!
//! impl SettingKey for UserSetting {
//!     fn all() -> &'static [Self] {
//!         &[Self::Newsletter, Self::PageSize, Self::Theme]
//!     }
//!
//!     fn definition(&self) -> SettingDefinition {
//!         match self {
//!             Self::Newsletter => SettingDefinition::new("newsletter", SettingKind::Boolean, false)
//!                 .with_request_path("notifications.newsletter"),
//!             Self::PageSize => SettingDefinition::new("page_size", SettingKind::Integer, 15)
//!                 .with_validator(|field, value| {
//!                     validators::validate_range(field, value.as_i64().unwrap_or_default(), Some(1), Some(100))
//!                 }),
//!             Self::Theme => SettingDefinition::new("theme", SettingKind::Enum(&["light", "dark"]), "light"),
//!         }
//!     }
//! }
//!
//! let mut settings = Settings::<UserSetting>::from_column(&user.settings);
//! settings.fill_from_request(&payload)?;
//! user.settings = settings.to_column();
//! ```

use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

use crate::filtering::parse_bool;
use crate::validation::{ValidationError, ValidationErrors};

/// Declared type of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Boolean,
    Integer,
    Float,
    String,
    /// A string restricted to the listed values
    Enum(&'static [&'static str]),
    Array,
    /// Any JSON value
    Json,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("a boolean"),
            Self::Integer => f.write_str("an integer"),
            Self::Float => f.write_str("a number"),
            Self::String => f.write_str("a string"),
            Self::Enum(allowed) => write!(f, "one of: {}", allowed.join(", ")),
            Self::Array => f.write_str("a list"),
            Self::Json => f.write_str("valid JSON"),
        }
    }
}

/// Extra check run on the coerced value; receives the field name to report
pub type SettingValidator = fn(&str, &Value) -> Result<(), ValidationError>;

#[derive(Debug, Clone)]
pub struct SettingDefinition {
    /// Key in the stored JSON object
    pub key: &'static str,
    pub kind: SettingKind,
    pub default: Value,
    pub validator: Option<SettingValidator>,
    /// Dot path of the value in request payloads; the key itself when absent
    pub request_path: Option<&'static str>,
}

impl SettingDefinition {
    pub fn new(key: &'static str, kind: SettingKind, default: impl Into<Value>) -> Self {
        Self {
            key,
            kind,
            default: default.into(),
            validator: None,
            request_path: None,
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: SettingValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn with_request_path(mut self, path: &'static str) -> Self {
        self.request_path = Some(path);
        self
    }

    #[must_use]
    pub fn request_path(&self) -> &'static str {
        self.request_path.unwrap_or(self.key)
    }

    /// Coerce `value` to the declared kind and run the validator. `null` yields the default.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for `field` when the value cannot be coerced or is rejected.
    pub fn coerce(&self, field: &str, value: &Value) -> Result<Value, ValidationError> {
        if value.is_null() {
            return Ok(self.default.clone());
        }
        let coerced = coerce_kind(self.kind, value)
            .ok_or_else(|| ValidationError::new(field, format!("The {field} setting must be {}", self.kind)))?;
        if let Some(validator) = self.validator {
            validator(field, &coerced)?;
        }
        Ok(coerced)
    }
}

fn coerce_kind(kind: SettingKind, value: &Value) -> Option<Value> {
    match kind {
        SettingKind::Boolean => parse_bool(value).map(Value::Bool),
        SettingKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        SettingKind::Float => match value {
            Value::Number(n) => n.as_f64().map(Value::from),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
            _ => None,
        },
        SettingKind::String => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        SettingKind::Enum(allowed) => match value {
            Value::String(s) if allowed.contains(&s.as_str()) => Some(value.clone()),
            _ => None,
        },
        SettingKind::Array => match value {
            Value::Array(_) => Some(value.clone()),
            Value::String(s) => Some(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            _ => None,
        },
        SettingKind::Json => match value {
            Value::String(s) => Some(serde_json::from_str(s).unwrap_or_else(|_| value.clone())),
            other => Some(other.clone()),
        },
    }
}

/// Enumerates the settings of one model
pub trait SettingKey: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    fn all() -> &'static [Self];
    fn definition(&self) -> SettingDefinition;
}

/// Typed view over a settings column. Only explicitly set values are stored; reads fall back to
/// the declared default.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings<K: SettingKey> {
    values: Map<String, Value>,
    marker: PhantomData<K>,
}

impl<K: SettingKey> Settings<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Map::new(),
            marker: PhantomData,
        }
    }

    /// Load from the stored column. Unknown keys and values that no longer coerce are dropped
    /// (and logged), so a schema change never makes a record unreadable.
    #[must_use]
    pub fn from_column(column: &Value) -> Self {
        let mut settings = Self::new();
        let Some(stored) = column.as_object() else {
            if !column.is_null() {
                tracing::warn!("Settings column does not hold an object; using defaults");
            }
            return settings;
        };

        for key in K::all() {
            let definition = key.definition();
            let Some(raw) = stored.get(definition.key) else {
                continue;
            };
            match definition.coerce(definition.key, raw) {
                Ok(value) => {
                    settings.values.insert(definition.key.to_string(), value);
                }
                Err(e) => {
                    tracing::warn!(setting = definition.key, error = %e, "Dropping invalid stored setting");
                }
            }
        }
        settings
    }

    /// Flat JSON object to persist
    #[must_use]
    pub fn to_column(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Every setting with defaults filled in
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        K::all()
            .iter()
            .map(|key| (key.definition().key.to_string(), self.get(*key)))
            .collect()
    }

    #[must_use]
    pub fn get(&self, key: K) -> Value {
        let definition = key.definition();
        self.values
            .get(definition.key)
            .cloned()
            .unwrap_or(definition.default)
    }

    #[must_use]
    pub fn get_bool(&self, key: K) -> Option<bool> {
        self.get(key).as_bool()
    }

    #[must_use]
    pub fn get_i64(&self, key: K) -> Option<i64> {
        self.get(key).as_i64()
    }

    #[must_use]
    pub fn get_f64(&self, key: K) -> Option<f64> {
        self.get(key).as_f64()
    }

    #[must_use]
    pub fn get_string(&self, key: K) -> Option<String> {
        self.get(key).as_str().map(str::to_string)
    }

    #[must_use]
    pub fn is_set(&self, key: K) -> bool {
        self.values.contains_key(key.definition().key)
    }

    /// # Errors
    ///
    /// Returns the validation failure when `value` does not fit the setting.
    pub fn set(&mut self, key: K, value: impl Into<Value>) -> Result<(), ValidationErrors> {
        let definition = key.definition();
        let value = definition.coerce(definition.key, &value.into())?;
        self.values.insert(definition.key.to_string(), value);
        Ok(())
    }

    /// Forget the stored value so the default applies again
    pub fn reset(&mut self, key: K) {
        self.values.remove(key.definition().key);
    }

    /// Apply every setting present in a (possibly nested) request payload, located by its
    /// request path. Nothing is applied unless every present value is valid.
    ///
    /// # Errors
    ///
    /// Returns all failures, keyed by request path.
    pub fn fill_from_request(&mut self, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut accepted = Vec::new();

        for key in K::all() {
            let definition = key.definition();
            let path = definition.request_path();
            let Some(raw) = lookup_path(payload, path) else {
                continue;
            };
            match definition.coerce(path, raw) {
                Ok(value) => accepted.push((definition.key, value)),
                Err(e) => errors.add(e),
            }
        }

        errors.result()?;
        for (key, value) in accepted {
            self.values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

impl<K: SettingKey> Default for Settings<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_path<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(payload, |node, segment| node.as_object()?.get(segment))
}
