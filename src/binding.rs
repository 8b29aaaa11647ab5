//! # Route Model Binding
//!
//! Registers a route parameter against a resource manager and a repository, so that handlers
//! receive the hydrated record instead of a raw key. Inclusions requested in the query string
//! are honored through the item pipeline.
//!
//! ```rust,ignore
//! let posts = Arc::new(RouteBinding::new(
//!     "post",
//!     Arc::new(ResourceManager::new(Posts)?),
//!     Arc::new(DbRepository::<post::Entity>::new(db.clone())),
//! ));
//!
//! async fn show(Bound(post): Bound<Posts>) -> Json<PostOutput> {
//!     Json(post)
//! }
//!
//! let app = Router::new()
//!     .route("/posts/{post}", get(show))
//!     .with_state(posts);
//! ```
//!
//! With a larger application state, implement `FromRef<AppState>` for `Arc<RouteBinding<Posts>>`.

use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Repository, Resource};
use crate::errors::ApiError;
use crate::manager::ResourceManager;
use crate::request::ResourceRequest;

type SharedRepository<R> = Arc<dyn Repository<Entity = <R as Resource>::Entity>>;

pub struct RouteBinding<R: Resource> {
    param: String,
    manager: Arc<ResourceManager<R>>,
    repository: SharedRepository<R>,
    not_found: Option<Arc<dyn Fn(&str) -> ApiError + Send + Sync>>,
}

impl<R: Resource> RouteBinding<R> {
    pub fn new(param: impl Into<String>, manager: Arc<ResourceManager<R>>, repository: SharedRepository<R>) -> Self {
        Self {
            param: param.into(),
            manager,
            repository,
            not_found: None,
        }
    }

    /// Failure raised instead of the resource's own not-found failure for this route
    #[must_use]
    pub fn not_found_with<F>(mut self, build: F) -> Self
    where
        F: Fn(&str) -> ApiError + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(build));
        self
    }

    #[must_use]
    pub fn param(&self) -> &str {
        &self.param
    }

    #[must_use]
    pub fn manager(&self) -> &ResourceManager<R> {
        &self.manager
    }

    /// Look `key` up through the manager's item flow.
    ///
    /// # Errors
    ///
    /// Returns the binding's not-found failure (or the resource's) when nothing matches.
    pub async fn resolve(&self, request: &ResourceRequest, key: &str) -> Result<R::Output, ApiError> {
        self.manager
            .find_item(request, self.repository.as_ref(), key)
            .await?
            .ok_or_else(|| {
                self.not_found
                    .as_ref()
                    .map_or_else(|| self.manager.descriptor().not_found(key), |build| build(key))
            })
    }
}

/// Extractor yielding the record bound to the route parameter of a [`RouteBinding`]
pub struct Bound<R: Resource>(pub R::Output);

impl<S, R> FromRequestParts<S> for Bound<R>
where
    S: Send + Sync,
    R: Resource + 'static,
    Arc<RouteBinding<R>>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let binding = Arc::<RouteBinding<R>>::from_ref(state);

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let key = params.get(binding.param()).ok_or_else(|| {
            ApiError::configuration(format!(
                "route has no `{}` parameter to bind `{}`",
                binding.param(),
                binding.manager().descriptor().name()
            ))
        })?;

        let request = ResourceRequest::from_request_parts(parts, state).await?;
        tracing::debug!(param = binding.param(), key = %key, "Resolving bound route parameter");
        binding.resolve(&request, key).await.map(Bound)
    }
}
