//! # Resource Manager
//!
//! Orchestrates one fetch: the request adapter output, the resource descriptor, a repository
//! and the configured pipeline.
//!
//! 1. start from the repository's base query
//! 2. run the descriptor's pipeline for this kind of fetch against a [`QueryBuilder`]
//! 3. execute the terminal repository operation (`paginate`, `list` or `first`)
//! 4. hydrate the models, loading the relation tree collected by the pipeline
//!
//! ```rust,ignore
//! let manager = ResourceManager::new(Posts)?;
//! let repository = DbRepository::<post::Entity>::new(db.clone());
//!
//! async fn index(request: ResourceRequest) -> Result<Paginated<PostOutput>, ApiError> {
//!     manager.get_paginator(&request, &repository).await
//! }
//! ```

use sea_orm::{EntityName, Select};

use crate::core::{Repository, Resource};
use crate::descriptor::ResourceDescriptor;
use crate::errors::ApiError;
use crate::pagination::Paginated;
use crate::pipeline::{Pipeline, PipelineContext};
use crate::query::{Includes, QueryBuilder};
use crate::request::ResourceRequest;

pub struct ResourceManager<R: Resource> {
    resource: R,
    descriptor: ResourceDescriptor<R::Entity>,
}

impl<R: Resource> ResourceManager<R> {
    /// Describe and validate the resource once.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` when the descriptor references undeclared filters,
    /// sorters or inclusions.
    pub fn new(resource: R) -> Result<Self, ApiError> {
        let descriptor = resource.describe();
        descriptor.validate()?;
        tracing::debug!(
            resource = descriptor.name(),
            filters = descriptor.filters().len(),
            sorters = descriptor.sorters().len(),
            "Resource registered"
        );
        Ok(Self { resource, descriptor })
    }

    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    #[must_use]
    pub fn descriptor(&self) -> &ResourceDescriptor<R::Entity> {
        &self.descriptor
    }

    /// Filtered, sorted page of outputs
    ///
    /// # Errors
    ///
    /// Returns the first pipeline failure, or a database failure.
    pub async fn get_paginator<Repo>(
        &self,
        request: &ResourceRequest,
        repository: &Repo,
    ) -> Result<Paginated<R::Output>, ApiError>
    where
        Repo: Repository<Entity = R::Entity> + ?Sized,
    {
        let (select, includes) = self.prepare(self.descriptor.paginator_commands(), request, repository.query())?;
        let pagination = request.pagination();
        let (models, total) = repository.paginate(select, pagination).await?;
        let items = self.resource.hydrate(repository.connection(), models, &includes).await?;
        Ok(Paginated::new(items, pagination, total, self.descriptor.name()))
    }

    /// Every matching output, unpaginated
    ///
    /// # Errors
    ///
    /// Returns the first pipeline failure, or a database failure.
    pub async fn get_list<Repo>(&self, request: &ResourceRequest, repository: &Repo) -> Result<Vec<R::Output>, ApiError>
    where
        Repo: Repository<Entity = R::Entity> + ?Sized,
    {
        let (select, includes) = self.prepare(self.descriptor.list_commands(), request, repository.query())?;
        let models = repository.list(select).await?;
        self.resource.hydrate(repository.connection(), models, &includes).await
    }

    /// The single record identified by `key`, through the descriptor's item lookup (primary key
    /// unless overridden)
    ///
    /// # Errors
    ///
    /// Returns the descriptor's not-found failure when nothing matches, the first pipeline
    /// failure, or a database failure.
    pub async fn get_item<Repo>(
        &self,
        request: &ResourceRequest,
        repository: &Repo,
        key: &str,
    ) -> Result<R::Output, ApiError>
    where
        Repo: Repository<Entity = R::Entity> + ?Sized,
    {
        self.find_item(request, repository, key)
            .await?
            .ok_or_else(|| self.descriptor.not_found(key))
    }

    /// Like [`get_item`](Self::get_item), but a miss is `Ok(None)` so callers pick the failure.
    ///
    /// A key the item lookup cannot use counts as a miss.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline failure or a database failure.
    pub async fn find_item<Repo>(
        &self,
        request: &ResourceRequest,
        repository: &Repo,
        key: &str,
    ) -> Result<Option<R::Output>, ApiError>
    where
        Repo: Repository<Entity = R::Entity> + ?Sized,
    {
        let Some(criterion) = self.descriptor.item_lookup().criterion(key) else {
            tracing::debug!(resource = self.descriptor.name(), key, "Key rejected by item lookup");
            return Ok(None);
        };
        let select = criterion.apply(repository.query());
        let (select, includes) = self.prepare(self.descriptor.item_commands(), request, select)?;

        let Some(model) = repository.first(select).await? else {
            return Ok(None);
        };
        Ok(self
            .resource
            .hydrate(repository.connection(), vec![model], &includes)
            .await?
            .pop())
    }

    fn prepare(
        &self,
        pipeline: &Pipeline<R::Entity>,
        request: &ResourceRequest,
        select: Select<R::Entity>,
    ) -> Result<(Select<R::Entity>, Includes), ApiError> {
        let mut query = QueryBuilder::new(select);
        pipeline.run(&PipelineContext::new(&self.descriptor, request), &mut query)?;
        Ok(query.into_parts())
    }
}

impl<R: Resource> std::fmt::Debug for ResourceManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("resource", &self.descriptor.name())
            .field("table", &<R::Entity as Default>::default().table_name())
            .finish_non_exhaustive()
    }
}
