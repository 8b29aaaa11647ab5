//! Declarative API resources on top of sea-orm and axum.
//!
//! A resource declares its filters, sorters and inclusions once; a [`ResourceManager`] turns
//! each request into a filtered, sorted, paginated query with the requested relations loaded.
//! Around that core sit API versioning, route model binding, typed model settings, form
//! descriptions and a fixed error envelope with localization.

pub mod binding;
pub mod config;
pub mod core;
pub mod descriptor;
pub mod errors;
pub mod filtering;
pub mod forms;
pub mod localization;
pub mod manager;
pub mod pagination;
pub mod pipeline;
pub mod query;
pub mod request;
pub mod settings;
pub mod transformer;
pub mod validation;
pub mod versioning;

pub use binding::{Bound, RouteBinding};
pub use config::{FilterSource, ToolkitConfig};
pub use crate::core::{DbRepository, Repository, Resource};
pub use descriptor::{ItemLookup, ResourceDescriptor};
pub use errors::{ApiError, DomainError, ErrorEnvelope};
pub use filtering::{
    BooleanFilter, ColumnSorter, ExactFilter, Filter, FilterValues, InFilter, LikeFilter, SortDirection, Sorter,
    VirtualColumnSorter,
};
pub use forms::{Field, Form, FormDocument, Section};
pub use localization::{Localizer, Translator, localize_errors};
pub use manager::ResourceManager;
pub use pagination::{Paginated, Pagination};
pub use pipeline::{Command, Pipeline};
pub use query::{Criterion, Includes, QueryBuilder};
pub use request::{ListQueryParams, ResourceRequest};
pub use settings::{SettingDefinition, SettingKey, SettingKind, Settings};
pub use transformer::Transformer;
pub use validation::{ValidationError, ValidationErrors};
pub use versioning::{ApiVersion, VersionBinder, VersionRegistry, VersionScope, VersionSource, bind_version};

pub use async_trait::async_trait;
pub use serde_with;
