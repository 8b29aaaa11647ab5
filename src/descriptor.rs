//! # Resource Descriptor
//!
//! Declares the public query surface of one entity: which filters, sorters and inclusions a
//! client may use, what applies when the client supplies none of them, how a single item is
//! looked up, and which pipeline runs for each kind of fetch.
//!
//! ```rust,ignore
//! let descriptor = ResourceDescriptor::<post::Entity>::new("posts")
//!     .filter("status", ExactFilter::new(post::Column::Status))
//!     .filter("published", BooleanFilter::new(post::Column::Published))
//!     .sorter("title", ColumnSorter)
//!     .sorter("registered_at", VirtualColumnSorter::new(post::Column::CreatedAt))
//!     .include("author", ["author"])
//!     .include("thread", ["comments", "comments.author"])
//!     .default_filter("status", "published")
//!     .default_sort("-registered_at")
//!     .lookup_by(post::Column::Uuid);
//! ```
//!
//! Defaults are all-or-nothing: supplying any recognized filter suppresses every default
//! filter, and supplying any inclusion replaces the default inclusions. Global inclusions are
//! always loaded.

use sea_orm::EntityTrait;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::filtering::{Filter, FilterSet, FilterValues, SortDirective, Sorter, SorterSet, coerce};
use crate::pipeline::Pipeline;
use crate::query::{ByPrimaryKey, Criterion, Where};

type NotFoundFn = Arc<dyn Fn(&str) -> ApiError + Send + Sync>;
type LookupFn<E> = Arc<dyn Fn(&str) -> Option<Box<dyn Criterion<E>>> + Send + Sync>;

/// How [`get_item`](crate::manager::ResourceManager::get_item) finds a record from its key
pub enum ItemLookup<E: EntityTrait> {
    /// First primary key column
    PrimaryKey,
    /// An alternate unique column (e.g. a public UUID)
    Column(E::Column),
    /// Arbitrary criterion built from the key; `None` means the key cannot match anything
    Custom(LookupFn<E>),
}

impl<E: EntityTrait> ItemLookup<E> {
    /// Criterion selecting the record identified by `key`, or `None` when the key can never
    /// match (e.g. a malformed UUID for a UUID column).
    #[must_use]
    pub fn criterion(&self, key: &str) -> Option<Box<dyn Criterion<E>>> {
        match self {
            Self::PrimaryKey => Some(Box::new(ByPrimaryKey::new(key))),
            Self::Column(column) => match coerce(*column, &Value::String(key.to_string())) {
                Ok(value) => Some(Box::new(Where::<E>::new(*column, value))),
                Err(_) => {
                    tracing::debug!(key, "Item key does not fit the lookup column");
                    None
                }
            },
            Self::Custom(build) => build(key),
        }
    }
}

pub struct ResourceDescriptor<E: EntityTrait> {
    name: String,
    filters: FilterSet<E>,
    sorters: SorterSet<E>,
    inclusions: Vec<(String, Vec<String>)>,
    default_filters: FilterValues,
    global_inclusions: Vec<String>,
    default_inclusions: Vec<String>,
    default_sort: Option<SortDirective>,
    item_lookup: ItemLookup<E>,
    not_found: Option<NotFoundFn>,
    paginator_pipeline: Pipeline<E>,
    list_pipeline: Pipeline<E>,
    item_pipeline: Pipeline<E>,
}

impl<E: EntityTrait> ResourceDescriptor<E> {
    /// `name` is used in not-found messages and in the `Content-Range` header
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: FilterSet::new(),
            sorters: SorterSet::new(),
            inclusions: Vec::new(),
            default_filters: FilterValues::new(),
            global_inclusions: Vec::new(),
            default_inclusions: Vec::new(),
            default_sort: None,
            item_lookup: ItemLookup::PrimaryKey,
            not_found: None,
            paginator_pipeline: Pipeline::standard(),
            list_pipeline: Pipeline::standard(),
            item_pipeline: Pipeline::item(),
        }
    }

    // ============================================================================
    // Declaration
    // ============================================================================

    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, filter: impl Filter<E> + 'static) -> Self {
        self.filters.insert(name, Box::new(filter));
        self
    }

    #[must_use]
    pub fn sorter(mut self, name: impl Into<String>, sorter: impl Sorter<E> + 'static) -> Self {
        self.sorters.insert(name, Box::new(sorter));
        self
    }

    /// Map a public inclusion name to one or more relation paths (dot notation for nesting).
    /// Declaring the same name again replaces its paths.
    #[must_use]
    pub fn include<P: Into<String>>(mut self, name: impl Into<String>, paths: impl IntoIterator<Item = P>) -> Self {
        let name = name.into();
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        match self.inclusions.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = paths,
            None => self.inclusions.push((name, paths)),
        }
        self
    }

    #[must_use]
    pub fn default_filter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_filters.insert(name, value);
        self
    }

    /// Loaded on every request, whatever the client asks for
    #[must_use]
    pub fn global_include(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.global_inclusions, name.into());
        self
    }

    /// Loaded only when the client requests no inclusion
    #[must_use]
    pub fn default_include(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.default_inclusions, name.into());
        self
    }

    /// Default sort in request syntax: `column` or `-column`. An empty column clears it.
    #[must_use]
    pub fn default_sort(mut self, directive: &str) -> Self {
        self.default_sort = SortDirective::parse(directive);
        self
    }

    /// Look items up by an alternate column instead of the primary key
    #[must_use]
    pub fn lookup_by(mut self, column: E::Column) -> Self {
        self.item_lookup = ItemLookup::Column(column);
        self
    }

    #[must_use]
    pub fn lookup_with<F>(mut self, build: F) -> Self
    where
        F: Fn(&str) -> Option<Box<dyn Criterion<E>>> + Send + Sync + 'static,
    {
        self.item_lookup = ItemLookup::Custom(Arc::new(build));
        self
    }

    /// Replace the generic not-found failure raised when an item lookup matches nothing
    #[must_use]
    pub fn not_found_with<F>(mut self, build: F) -> Self
    where
        F: Fn(&str) -> ApiError + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(build));
        self
    }

    #[must_use]
    pub fn paginator_pipeline(mut self, pipeline: Pipeline<E>) -> Self {
        self.paginator_pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn list_pipeline(mut self, pipeline: Pipeline<E>) -> Self {
        self.list_pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn item_pipeline(mut self, pipeline: Pipeline<E>) -> Self {
        self.item_pipeline = pipeline;
        self
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn filters(&self) -> &FilterSet<E> {
        &self.filters
    }

    #[must_use]
    pub fn sorters(&self) -> &SorterSet<E> {
        &self.sorters
    }

    /// Relation paths declared for inclusion `name`
    #[must_use]
    pub fn inclusion_paths(&self, name: &str) -> Option<&[String]> {
        self.inclusions
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, paths)| paths.as_slice())
    }

    pub fn inclusion_names(&self) -> impl Iterator<Item = &str> {
        self.inclusions.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn default_filters(&self) -> &FilterValues {
        &self.default_filters
    }

    #[must_use]
    pub fn global_inclusions(&self) -> &[String] {
        &self.global_inclusions
    }

    #[must_use]
    pub fn default_inclusions(&self) -> &[String] {
        &self.default_inclusions
    }

    #[must_use]
    pub fn default_sort_directive(&self) -> Option<&SortDirective> {
        self.default_sort.as_ref()
    }

    #[must_use]
    pub fn item_lookup(&self) -> &ItemLookup<E> {
        &self.item_lookup
    }

    /// Failure for an item lookup of `key` that matched nothing
    #[must_use]
    pub fn not_found(&self, key: &str) -> ApiError {
        match &self.not_found {
            Some(build) => build(key),
            None => ApiError::not_found(&self.name, Some(key.to_string())),
        }
    }

    #[must_use]
    pub fn paginator_commands(&self) -> &Pipeline<E> {
        &self.paginator_pipeline
    }

    #[must_use]
    pub fn list_commands(&self) -> &Pipeline<E> {
        &self.list_pipeline
    }

    #[must_use]
    pub fn item_commands(&self) -> &Pipeline<E> {
        &self.item_pipeline
    }

    /// Check that every default refers to something declared.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` naming the first dangling reference.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = self.default_filters.names().find(|name| !self.filters.contains(name)) {
            return Err(ApiError::configuration(format!(
                "resource `{}` declares a default for unknown filter `{name}`",
                self.name
            )));
        }

        if let Some(sort) = &self.default_sort
            && !self.sorters.contains(&sort.column)
        {
            return Err(ApiError::configuration(format!(
                "resource `{}` default sort `{}` has no sorter",
                self.name, sort.column
            )));
        }

        let declared = |name: &String| self.inclusion_paths(name).is_some();
        if let Some(name) = self
            .global_inclusions
            .iter()
            .chain(&self.default_inclusions)
            .find(|name| !declared(name))
        {
            return Err(ApiError::configuration(format!(
                "resource `{}` references undeclared inclusion `{name}`",
                self.name
            )));
        }

        Ok(())
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CODE_CONFIGURATION;
    use crate::filtering::{ColumnSorter, ExactFilter, SortDirection};
    use uuid::Uuid;

    mod post {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "posts")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub uuid: Uuid,
            pub status: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn descriptor() -> ResourceDescriptor<post::Entity> {
        ResourceDescriptor::new("posts")
            .filter("status", ExactFilter::new(post::Column::Status))
            .sorter("id", ColumnSorter)
            .include("author", ["author"])
    }

    #[test]
    fn test_valid_descriptor() {
        let descriptor = descriptor()
            .default_filter("status", "published")
            .default_sort("-id")
            .global_include("author");
        assert!(descriptor.validate().is_ok());
        let sort = descriptor.default_sort_directive().unwrap();
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_unknown_default_filter_is_configuration_error() {
        let err = descriptor().default_filter("title", "x").validate().unwrap_err();
        assert_eq!(err.code(), CODE_CONFIGURATION);
    }

    #[test]
    fn test_default_sort_without_sorter_is_configuration_error() {
        assert!(descriptor().default_sort("created_at").validate().is_err());
    }

    #[test]
    fn test_undeclared_default_inclusion_is_configuration_error() {
        assert!(descriptor().default_include("comments").validate().is_err());
        assert!(descriptor().global_include("comments").validate().is_err());
    }

    #[test]
    fn test_include_redeclaration_replaces_paths() {
        let descriptor = descriptor().include("author", ["author", "author.profile"]);
        assert_eq!(
            descriptor.inclusion_paths("author"),
            Some(["author".to_string(), "author.profile".to_string()].as_slice())
        );
        assert_eq!(descriptor.inclusion_names().count(), 1);
    }

    #[test]
    fn test_not_found_default_and_override() {
        let err = descriptor().not_found("42");
        assert_eq!(err.user_message(), "posts with ID '42' not found");

        let custom = descriptor()
            .not_found_with(|key| ApiError::bad_request(format!("no post {key}")))
            .not_found("42");
        assert_eq!(custom.user_message(), "no post 42");
    }

    #[test]
    fn test_column_lookup_rejects_malformed_keys() {
        let lookup = ItemLookup::<post::Entity>::Column(post::Column::Uuid);
        assert!(lookup.criterion("not-a-uuid").is_none());
        assert!(lookup.criterion(&Uuid::new_v4().to_string()).is_some());
    }
}
