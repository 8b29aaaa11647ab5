use sea_orm::{EntityName, EntityTrait, sea_query::Order};
use std::fmt;
use std::str::FromStr;

use crate::errors::ApiError;
use crate::query::QueryBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// A public sort column and its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub column: String,
    pub direction: SortDirection,
}

impl SortDirective {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Parse `column` / `-column` (descending) / `+column`.
    ///
    /// Returns `None` when no column name remains.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (column, direction) = match raw.strip_prefix('-') {
            Some(column) => (column, SortDirection::Desc),
            None => (raw.strip_prefix('+').unwrap_or(raw), SortDirection::Asc),
        };
        let column = column.trim();
        (!column.is_empty()).then(|| Self::new(column, direction))
    }
}

/// Translates a public sort column into a query mutation
pub trait Sorter<E: EntityTrait>: Send + Sync {
    /// # Errors
    ///
    /// Returns an `ApiError` when the column cannot be sorted on.
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        column: &str,
        direction: SortDirection,
    ) -> Result<(), ApiError>;
}

impl<E, F> Sorter<E> for F
where
    E: EntityTrait,
    F: Fn(&mut QueryBuilder<E>, &str, SortDirection) -> Result<(), ApiError> + Send + Sync,
{
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        column: &str,
        direction: SortDirection,
    ) -> Result<(), ApiError> {
        self(query, column, direction)
    }
}

/// Orders by the entity column of the same name as the public column
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnSorter;

impl<E: EntityTrait> Sorter<E> for ColumnSorter {
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        column: &str,
        direction: SortDirection,
    ) -> Result<(), ApiError> {
        let entity_column = E::Column::from_str(column).map_err(|_| {
            ApiError::configuration(format!(
                "sort column `{column}` is not a column of `{}`",
                E::default().table_name()
            ))
        })?;
        query.order_by(entity_column, direction);
        Ok(())
    }
}

/// Orders by a fixed entity column, whatever public name it is registered under
pub struct VirtualColumnSorter<E: EntityTrait> {
    column: E::Column,
}

impl<E: EntityTrait> VirtualColumnSorter<E> {
    pub fn new(column: E::Column) -> Self {
        Self { column }
    }
}

impl<E: EntityTrait> Sorter<E> for VirtualColumnSorter<E> {
    fn apply(
        &self,
        query: &mut QueryBuilder<E>,
        _column: &str,
        direction: SortDirection,
    ) -> Result<(), ApiError> {
        query.order_by(self.column, direction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ascending() {
        assert_eq!(
            SortDirective::parse("title"),
            Some(SortDirective::new("title", SortDirection::Asc))
        );
        assert_eq!(
            SortDirective::parse("+title"),
            Some(SortDirective::new("title", SortDirection::Asc))
        );
    }

    #[test]
    fn test_minus_prefix_is_descending() {
        assert_eq!(
            SortDirective::parse("-registered_at"),
            Some(SortDirective::new("registered_at", SortDirection::Desc))
        );
    }

    #[test]
    fn test_empty_column_is_none() {
        assert_eq!(SortDirective::parse(""), None);
        assert_eq!(SortDirective::parse("-"), None);
        assert_eq!(SortDirective::parse("  "), None);
    }

    #[test]
    fn test_direction_into_order() {
        assert_eq!(Order::from(SortDirection::Asc), Order::Asc);
        assert_eq!(Order::from(SortDirection::Desc), Order::Desc);
    }
}
