//! # Query Builder Facade
//!
//! Filters, sorters and pipeline commands never touch the ORM directly. They receive a
//! [`QueryBuilder`], a narrow wrapper over a sea-orm [`Select`] exposing:
//!
//! - [`add_criteria`](QueryBuilder::add_criteria): append a reusable [`Criterion`]
//! - [`with`](QueryBuilder::with): request eager loading of a relation path
//! - [`order_by`](QueryBuilder::order_by) and [`limit`](QueryBuilder::limit)
//! - [`native`](QueryBuilder::native) / [`map_native`](QueryBuilder::map_native): escape hatch
//!   to the underlying select for anything else (joins, grouping, raw expressions)

pub mod criteria;
pub mod includes;

pub use criteria::{ByPrimaryKey, Criterion, Where, WhereIn, WhereLike, WhereNotNull, WhereNull};
pub use includes::Includes;

use sea_orm::{EntityTrait, QueryOrder, QuerySelect, Select};

use crate::filtering::sort::SortDirection;

pub struct QueryBuilder<E: EntityTrait> {
    select: Select<E>,
    includes: Includes,
}

impl<E: EntityTrait> QueryBuilder<E> {
    #[must_use]
    pub fn new(select: Select<E>) -> Self {
        Self {
            select,
            includes: Includes::new(),
        }
    }

    pub fn add_criteria(&mut self, criterion: impl Criterion<E>) -> &mut Self {
        self.map_native(|select| criterion.apply(select))
    }

    pub fn add_boxed_criteria(&mut self, criterion: &dyn Criterion<E>) -> &mut Self {
        self.map_native(|select| criterion.apply(select))
    }

    /// Eager-load a relation path; dot notation loads every level (`posts.comments`)
    pub fn with(&mut self, path: &str) -> &mut Self {
        self.includes.insert(path);
        self
    }

    pub fn order_by(&mut self, column: E::Column, direction: SortDirection) -> &mut Self {
        self.map_native(|select| select.order_by(column, direction.into()))
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.map_native(|select| select.limit(limit))
    }

    #[must_use]
    pub fn native(&self) -> &Select<E> {
        &self.select
    }

    pub fn map_native(&mut self, f: impl FnOnce(Select<E>) -> Select<E>) -> &mut Self {
        let select = std::mem::replace(&mut self.select, E::find());
        self.select = f(select);
        self
    }

    #[must_use]
    pub fn includes(&self) -> &Includes {
        &self.includes
    }

    #[must_use]
    pub fn into_parts(self) -> (Select<E>, Includes) {
        (self.select, self.includes)
    }
}

impl<E: EntityTrait> From<Select<E>> for QueryBuilder<E> {
    fn from(select: Select<E>) -> Self {
        Self::new(select)
    }
}
