use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Value as SqlValue};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::query::{QueryBuilder, Where, WhereIn, WhereLike};

/// Resolved filter name → raw value pairs for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterValues(BTreeMap<String, Value>);

impl FilterValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FilterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A named filter handler.
///
/// Receives the query, the value supplied for this filter and the full resolved value set, so
/// that a handler can combine several parameters (e.g. a `from`/`to` range).
pub trait Filter<E: EntityTrait>: Send + Sync {
    /// # Errors
    ///
    /// Returns an `ApiError` (usually `ValidationFailed`) when the value is rejected.
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        value: &Value,
        values: &FilterValues,
    ) -> Result<(), ApiError>;
}

impl<E, F> Filter<E> for F
where
    E: EntityTrait,
    F: Fn(&mut QueryBuilder<E>, &Value, &FilterValues) -> Result<(), ApiError> + Send + Sync,
{
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        value: &Value,
        values: &FilterValues,
    ) -> Result<(), ApiError> {
        self(query, value, values)
    }
}

/// `column = value`, with the value coerced to the column type
pub struct ExactFilter<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> ExactFilter<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Filter<E> for ExactFilter<E> {
    fn apply(&self, query: &mut QueryBuilder<E>, value: &Value, _: &FilterValues) -> Result<(), ApiError> {
        let value = coerce(self.column, value)?;
        query.add_criteria(Where::<E>::new(self.column, value));
        Ok(())
    }
}

/// `column IN (...)` from a comma-separated string or a JSON array
pub struct InFilter<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> InFilter<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Filter<E> for InFilter<E> {
    fn apply(&self, query: &mut QueryBuilder<E>, value: &Value, _: &FilterValues) -> Result<(), ApiError> {
        let raw: Vec<Value> = match value {
            Value::Array(items) => items.clone(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
            other => vec![other.clone()],
        };
        if raw.is_empty() {
            return Ok(());
        }
        let values = raw
            .iter()
            .map(|item| coerce(self.column, item))
            .collect::<Result<Vec<_>, _>>()?;
        query.add_criteria(WhereIn::<E>::new(self.column, values));
        Ok(())
    }
}

/// Case-insensitive substring match
pub struct LikeFilter<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> LikeFilter<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Filter<E> for LikeFilter<E> {
    fn apply(&self, query: &mut QueryBuilder<E>, value: &Value, _: &FilterValues) -> Result<(), ApiError> {
        let needle = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Null => return Ok(()),
            other => other.to_string(),
        };
        if !needle.is_empty() {
            query.add_criteria(WhereLike::<E>::new(self.column, needle));
        }
        Ok(())
    }
}

/// `column = true/false`; anything that is not a recognizable boolean is rejected
pub struct BooleanFilter<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> BooleanFilter<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Filter<E> for BooleanFilter<E> {
    fn apply(&self, query: &mut QueryBuilder<E>, value: &Value, _: &FilterValues) -> Result<(), ApiError> {
        let flag = parse_bool(value).ok_or_else(|| {
            ApiError::invalid_field(
                self.column.as_str(),
                format!("The {} filter must be a boolean", self.column.as_str()),
            )
        })?;
        query.add_criteria(Where::<E>::new(self.column, flag));
        Ok(())
    }
}

/// Accepts JSON booleans, `1`/`0` and `true/false/yes/no/on/off` in any case
#[must_use]
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Convert a raw filter value into a SQL value matching the column type
///
/// # Errors
///
/// Returns a validation failure naming the column when the value cannot be converted.
pub fn coerce<C: ColumnTrait>(column: C, value: &Value) -> Result<SqlValue, ApiError> {
    let name = column.as_str();
    let invalid = |expected: &str| ApiError::invalid_field(name, format!("The {name} filter must be {expected}"));
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    match column.def().get_column_type() {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => text
            .parse::<i64>()
            .map(SqlValue::from)
            .map_err(|_| invalid("an integer")),
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => text
            .parse::<f64>()
            .map(SqlValue::from)
            .map_err(|_| invalid("a number")),
        ColumnType::Boolean => parse_bool(value)
            .map(SqlValue::from)
            .ok_or_else(|| invalid("a boolean")),
        ColumnType::Uuid => Uuid::parse_str(&text)
            .map(SqlValue::from)
            .map_err(|_| invalid("a UUID")),
        _ => Ok(SqlValue::from(text)),
    }
}
