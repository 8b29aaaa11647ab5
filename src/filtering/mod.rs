//! # Filters & Sorters
//!
//! A resource declares which query parameters may narrow or order its listing. Each public
//! name maps to a handler:
//!
//! - [`Filter`]: receives the value supplied for its name and mutates the query. Built-ins:
//!   [`ExactFilter`], [`InFilter`], [`LikeFilter`], [`BooleanFilter`]; any closure
//!   `Fn(&mut QueryBuilder<E>, &Value, &FilterValues) -> Result<(), ApiError>` works too.
//! - [`Sorter`]: receives the public column and direction. [`ColumnSorter`] orders by the entity
//!   column of the same name, [`VirtualColumnSorter`] exposes a column under another name, and
//!   closures can join or compute whatever they need.
//!
//! ```rust,ignore
//! GET /posts?status=published&author=3,4&order_by=-registered_at
//! ```

pub mod filters;
pub mod sort;

pub use filters::{
    BooleanFilter, ExactFilter, Filter, FilterValues, InFilter, LikeFilter, coerce, parse_bool,
};
pub use sort::{ColumnSorter, SortDirection, SortDirective, Sorter, VirtualColumnSorter};

/// Ordered name → handler table. Names are unique; inserting an existing name replaces its
/// handler in place.
pub struct Registry<T: ?Sized> {
    entries: Vec<(String, Box<T>)>,
}

impl<T: ?Sized> Registry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Box<T>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((name, handler)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, handler)| handler.as_ref())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .map(|(name, handler)| (name.as_str(), handler.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type FilterSet<E> = Registry<dyn Filter<E>>;
pub type SorterSet<E> = Registry<dyn Sorter<E>>;
