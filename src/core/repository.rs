use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QuerySelect, Select};
use std::sync::Arc;

use super::traits::{ModelOf, Repository};
use crate::errors::ApiError;
use crate::pagination::Pagination;
use crate::query::Criterion;

/// Repository backed by a sea-orm connection.
///
/// A scope criterion, when set, is applied to every query this repository starts, e.g. to hide
/// soft-deleted rows or to restrict rows to the current tenant.
pub struct DbRepository<E: EntityTrait> {
    db: DatabaseConnection,
    scope: Option<Arc<dyn Criterion<E>>>,
}

impl<E: EntityTrait> DbRepository<E> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, scope: None }
    }

    #[must_use]
    pub fn scoped(mut self, criterion: impl Criterion<E> + 'static) -> Self {
        self.scope = Some(Arc::new(criterion));
        self
    }
}

impl<E: EntityTrait> Clone for DbRepository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            scope: self.scope.clone(),
        }
    }
}

#[async_trait]
impl<E> Repository for DbRepository<E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    type Entity = E;

    fn query(&self) -> Select<E> {
        match &self.scope {
            Some(scope) => scope.apply(E::find()),
            None => E::find(),
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn paginate(&self, select: Select<E>, pagination: Pagination) -> Result<(Vec<ModelOf<E>>, u64), ApiError> {
        let total = select.clone().count(&self.db).await?;
        let items = select
            .offset(pagination.offset())
            .limit(pagination.count)
            .all(&self.db)
            .await?;
        Ok((items, total))
    }

    async fn list(&self, select: Select<E>) -> Result<Vec<ModelOf<E>>, ApiError> {
        Ok(select.all(&self.db).await?)
    }

    async fn first(&self, select: Select<E>) -> Result<Option<ModelOf<E>>, ApiError> {
        Ok(select.one(&self.db).await?)
    }
}
