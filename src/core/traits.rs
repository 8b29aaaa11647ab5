use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, Select};

use crate::descriptor::ResourceDescriptor;
use crate::errors::ApiError;
use crate::pagination::Pagination;
use crate::query::Includes;

pub type ModelOf<E> = <E as EntityTrait>::Model;

/// One entity exposed through the API.
///
/// ```rust,ignore
/// struct Posts;
///
/// #[async_trait]
/// impl Resource for Posts {
///     type Entity = post::Entity;
///     type Output = PostOutput;
///
///     fn describe(&self) -> ResourceDescriptor<post::Entity> {
///         ResourceDescriptor::new("posts")
///             .filter("status", ExactFilter::new(post::Column::Status))
///             .sorter("title", ColumnSorter)
///             .include("author", ["author"])
///     }
///
///     async fn hydrate(&self, db: &DatabaseConnection, models: Vec<post::Model>, includes: &Includes)
///         -> Result<Vec<PostOutput>, ApiError>
///     {
///         let authors = if includes.contains("author") {
///             Some(models.load_one(user::Entity, db).await?)
///         } else {
///             None
///         };
///         // zip models with the loaded relations...
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync {
    type Entity: EntityTrait;
    type Output: From<ModelOf<Self::Entity>> + Send;

    /// Filters, sorters, inclusions and defaults of this resource
    fn describe(&self) -> ResourceDescriptor<Self::Entity>;

    /// Turn fetched models into outputs, loading the requested relation tree.
    ///
    /// Implementations should issue one batched query per tree level (sea-orm's
    /// `LoaderTrait::load_one` / `load_many`). The default ignores inclusions.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if a relation query fails.
    async fn hydrate(
        &self,
        _db: &DatabaseConnection,
        models: Vec<ModelOf<Self::Entity>>,
        _includes: &Includes,
    ) -> Result<Vec<Self::Output>, ApiError> {
        Ok(models.into_iter().map(Into::into).collect())
    }
}

/// Source of rows for one entity, consumed by the manager's terminal operations
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: EntityTrait;

    /// Base query every fetch starts from
    fn query(&self) -> Select<Self::Entity>;

    /// Connection used for relation loading
    fn connection(&self) -> &DatabaseConnection;

    /// One page of rows plus the total matching row count
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` if a query fails.
    async fn paginate(
        &self,
        select: Select<Self::Entity>,
        pagination: Pagination,
    ) -> Result<(Vec<ModelOf<Self::Entity>>, u64), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Database` if the query fails.
    async fn list(&self, select: Select<Self::Entity>) -> Result<Vec<ModelOf<Self::Entity>>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Database` if the query fails.
    async fn first(&self, select: Select<Self::Entity>) -> Result<Option<ModelOf<Self::Entity>>, ApiError>;
}
