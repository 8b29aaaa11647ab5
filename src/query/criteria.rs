//! Reusable query criteria
//!
//! A criterion is a parameterized mutation of a sea-orm `Select`. Filters, scoped repositories
//! and item lookups all express their conditions as criteria so that the same unit can be reused
//! across resources:
//!
//! ```rust,ignore
//! query.add_criteria(Where::<post::Entity>::new(post::Column::Status, "published"));
//! query.add_criteria(|select: Select<post::Entity>| select.filter(post::Column::Views.gt(100)));
//! ```

use sea_orm::{
    ColumnTrait, EntityTrait, Iterable, PrimaryKeyToColumn, QueryFilter, Select, Value,
    sea_query::{Expr, Func, SimpleExpr},
};
use uuid::Uuid;

pub trait Criterion<E: EntityTrait>: Send + Sync {
    fn apply(&self, select: Select<E>) -> Select<E>;
}

impl<E, F> Criterion<E> for F
where
    E: EntityTrait,
    F: Fn(Select<E>) -> Select<E> + Send + Sync,
{
    fn apply(&self, select: Select<E>) -> Select<E> {
        self(select)
    }
}

/// `column = value`
pub struct Where<E: EntityTrait> {
    column: E::Column,
    value: Value,
}

impl<E: EntityTrait> Where<E> {
    pub fn new(column: E::Column, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl<E: EntityTrait> Criterion<E> for Where<E> {
    fn apply(&self, select: Select<E>) -> Select<E> {
        select.filter(self.column.eq(self.value.clone()))
    }
}

/// `column IN (values)`
pub struct WhereIn<E: EntityTrait> {
    column: E::Column,
    values: Vec<Value>,
}

impl<E: EntityTrait> WhereIn<E> {
    pub fn new<V: Into<Value>>(column: E::Column, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl<E: EntityTrait> Criterion<E> for WhereIn<E> {
    fn apply(&self, select: Select<E>) -> Select<E> {
        select.filter(self.column.is_in(self.values.clone()))
    }
}

/// Case-insensitive substring match: `UPPER(column) LIKE '%NEEDLE%'`
pub struct WhereLike<E: EntityTrait> {
    column: E::Column,
    needle: String,
}

impl<E: EntityTrait> WhereLike<E> {
    pub fn new(column: E::Column, needle: impl Into<String>) -> Self {
        Self {
            column,
            needle: needle.into(),
        }
    }
}

impl<E: EntityTrait> Criterion<E> for WhereLike<E> {
    fn apply(&self, select: Select<E>) -> Select<E> {
        select.filter(
            SimpleExpr::FunctionCall(Func::upper(Expr::col((E::default(), self.column))))
                .like(format!("%{}%", self.needle.to_uppercase())),
        )
    }
}

pub struct WhereNull<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> WhereNull<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Criterion<E> for WhereNull<E> {
    fn apply(&self, select: Select<E>) -> Select<E> {
        select.filter(self.column.is_null())
    }
}

pub struct WhereNotNull<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> WhereNotNull<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Criterion<E> for WhereNotNull<E> {
    fn apply(&self, select: Select<E>) -> Select<E> {
        select.filter(self.column.is_not_null())
    }
}

/// Match a record by the first primary key column.
///
/// The raw key is parsed as a UUID, then as an integer, and compared as a string otherwise.
pub struct ByPrimaryKey {
    key: String,
}

impl ByPrimaryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl<E: EntityTrait> Criterion<E> for ByPrimaryKey {
    fn apply(&self, select: Select<E>) -> Select<E> {
        match E::PrimaryKey::iter().next() {
            Some(primary_key) => select.filter(primary_key.into_column().eq(parse_key(&self.key))),
            None => {
                tracing::error!(key = %self.key, "Entity declares no primary key column");
                select.filter(Expr::val(1).eq(0))
            }
        }
    }
}

/// Parse a raw path or query key into the most specific SQL value
#[must_use]
pub fn parse_key(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(uuid) = Uuid::parse_str(trimmed) {
        return uuid.into();
    }
    if let Ok(number) = trimmed.parse::<i64>() {
        return number.into();
    }
    trimmed.to_string().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_prefers_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(parse_key(&uuid.to_string()), Value::from(uuid));
    }

    #[test]
    fn test_parse_key_integer_and_string() {
        assert_eq!(parse_key(" 42 "), Value::from(42_i64));
        assert_eq!(parse_key("hello-world"), Value::from("hello-world".to_string()));
    }
}
