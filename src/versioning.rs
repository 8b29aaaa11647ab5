//! # API Versioning
//!
//! Each version tag owns a set of interface → implementation bindings. Interfaces are trait
//! object types, so a `v1` and a `v2` transformer for the same output can coexist:
//!
//! ```rust,ignore
//! let mut registry = VersionRegistry::new();
//! registry.register("v1", true, |b| {
//!     b.bind::<dyn Transformer<PostOutput>>(Arc::new(PostV1));
//! })?;
//! registry.register("v2", false, |b| {
//!     b.bind::<dyn Transformer<PostOutput>>(Arc::new(PostV2));
//! })?;
//!
//! let app = Router::new()
//!     .route("/posts", get(index))
//!     .layer(middleware::from_fn_with_state(
//!         VersionBinder::new(Arc::new(registry), VersionSource::default()),
//!         bind_version,
//!     ));
//!
//! async fn index(version: ApiVersion, ...) -> Result<Json<Value>, ApiError> {
//!     let transformer = version.resolve::<dyn Transformer<PostOutput>>()?;
//!     ...
//! }
//! ```
//!
//! A request is *unbound* until the middleware sets its tag, and the tag can be set only once.
//! Resolution uses the bound tag when it is registered, the default version otherwise. A
//! registered version that lacks a binding falls back to the default version's binding.

use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use crate::errors::ApiError;

pub const DEFAULT_VERSION_HEADER: &str = "X-Api-Version";

/// Interface → implementation table of one version
#[derive(Default)]
pub struct Bindings {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `implementation` as the provider of interface `I` (usually `dyn Trait`)
    pub fn bind<I>(&mut self, implementation: Arc<I>) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.entries.insert(TypeId::of::<I>(), Box::new(implementation));
        self
    }

    #[must_use]
    pub fn get<I>(&self) -> Option<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<I>())
            .and_then(|entry| entry.downcast_ref::<Arc<I>>())
            .cloned()
    }

    #[must_use]
    pub fn contains<I>(&self) -> bool
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.entries.contains_key(&TypeId::of::<I>())
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

/// Every registered version and its bindings. Built once at startup, shared read-only.
#[derive(Default)]
pub struct VersionRegistry {
    versions: Vec<(String, Bindings)>,
    default: Option<String>,
}

impl VersionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tag` with the bindings configured by `configure`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` when `tag` is already registered or when a second
    /// version is marked as default.
    pub fn register<F>(&mut self, tag: impl Into<String>, is_default: bool, configure: F) -> Result<&mut Self, ApiError>
    where
        F: FnOnce(&mut Bindings),
    {
        let tag = tag.into();
        if self.is_registered(&tag) {
            return Err(ApiError::configuration(format!("API version `{tag}` is registered twice")));
        }
        if is_default && let Some(existing) = &self.default {
            return Err(ApiError::configuration(format!(
                "API version `{tag}` cannot be the default: `{existing}` already is"
            )));
        }

        let mut bindings = Bindings::new();
        configure(&mut bindings);
        tracing::debug!(version = %tag, bindings = bindings.len(), is_default, "API version registered");

        if is_default {
            self.default = Some(tag.clone());
        }
        self.versions.push((tag, bindings));
        Ok(self)
    }

    #[must_use]
    pub fn is_registered(&self, tag: &str) -> bool {
        self.bindings(tag).is_some()
    }

    #[must_use]
    pub fn default_tag(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|(tag, _)| tag.as_str())
    }

    #[must_use]
    pub fn bindings(&self, tag: &str) -> Option<&Bindings> {
        self.versions
            .iter()
            .find(|(existing, _)| existing == tag)
            .map(|(_, bindings)| bindings)
    }

    /// Tag whose bindings answer for `requested`: the tag itself when registered, else the
    /// default version
    #[must_use]
    pub fn effective_tag<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .filter(|tag| self.is_registered(tag))
            .or_else(|| self.default_tag())
    }

    /// Resolve interface `I` for `requested`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` when neither the effective version nor the default
    /// version binds `I`, or when no version applies at all.
    pub fn resolve<I>(&self, requested: Option<&str>) -> Result<Arc<I>, ApiError>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let tag = self.effective_tag(requested).ok_or_else(|| {
            ApiError::configuration(format!(
                "no API version matches `{}` and no default version is registered",
                requested.unwrap_or("<unset>")
            ))
        })?;

        self.bindings(tag)
            .and_then(Bindings::get::<I>)
            .or_else(|| {
                self.default_tag()
                    .filter(|default| *default != tag)
                    .and_then(|default| self.bindings(default))
                    .and_then(Bindings::get::<I>)
            })
            .ok_or_else(|| {
                ApiError::configuration(format!(
                    "API version `{tag}` has no binding for `{}`",
                    std::any::type_name::<I>()
                ))
            })
    }
}

/// Version state of one request: unbound until [`bind`](Self::bind), then fixed.
///
/// Clones share the same state, so the scope stored in the request extensions by the
/// middleware is the one handlers see.
#[derive(Clone)]
pub struct VersionScope {
    registry: Arc<VersionRegistry>,
    tag: Arc<OnceLock<String>>,
}

impl VersionScope {
    #[must_use]
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self {
            registry,
            tag: Arc::new(OnceLock::new()),
        }
    }

    /// Set the request's version tag. Binding the same tag again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` when the scope is already bound to another tag.
    pub fn bind(&self, tag: impl Into<String>) -> Result<(), ApiError> {
        let tag = tag.into();
        match self.tag.set(tag) {
            Ok(()) => Ok(()),
            Err(tag) if self.tag.get() == Some(&tag) => Ok(()),
            Err(tag) => Err(ApiError::configuration(format!(
                "API version already bound to `{}`, cannot rebind to `{tag}`",
                self.tag.get().map_or("", String::as_str)
            ))),
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.tag.get().is_some()
    }

    /// Tag set for this request, as received
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.get().map(String::as_str)
    }

    /// Version whose bindings answer this request
    #[must_use]
    pub fn active_tag(&self) -> Option<&str> {
        self.registry.effective_tag(self.tag())
    }

    /// # Errors
    ///
    /// See [`VersionRegistry::resolve`].
    pub fn resolve<I>(&self) -> Result<Arc<I>, ApiError>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve::<I>(self.tag())
    }
}

/// Where the middleware reads the version tag from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// Request header, `X-Api-Version` by default
    Header(String),
    /// Query parameter, e.g. `?version=v2`
    Query(String),
    /// First path segment when it is a registered tag: `/v2/posts`
    PathPrefix,
    /// Every request gets this tag
    Fixed(String),
}

impl Default for VersionSource {
    fn default() -> Self {
        Self::Header(DEFAULT_VERSION_HEADER.to_string())
    }
}

impl VersionSource {
    /// Raw tag carried by the request, if any
    #[must_use]
    pub fn extract(&self, parts: &Parts, registry: &VersionRegistry) -> Option<String> {
        let tag = match self {
            Self::Header(name) => parts
                .headers
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            Self::Query(name) => Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(mut params)| params.remove(name)),
            Self::PathPrefix => parts
                .uri
                .path()
                .trim_start_matches('/')
                .split('/')
                .next()
                .filter(|segment| registry.is_registered(segment))
                .map(str::to_string),
            Self::Fixed(tag) => Some(tag.clone()),
        };
        tag.map(|tag| tag.trim().to_string()).filter(|tag| !tag.is_empty())
    }
}

/// State of the [`bind_version`] middleware
#[derive(Clone)]
pub struct VersionBinder {
    registry: Arc<VersionRegistry>,
    source: VersionSource,
}

impl VersionBinder {
    #[must_use]
    pub fn new(registry: Arc<VersionRegistry>, source: VersionSource) -> Self {
        Self { registry, source }
    }
}

/// Middleware creating the request's [`VersionScope`] and binding the tag read from the
/// configured [`VersionSource`]. Use with `axum::middleware::from_fn_with_state`.
///
/// # Errors
///
/// Returns `ApiError::Configuration` when a scope already present on the request is bound to
/// another tag.
pub async fn bind_version(State(binder): State<VersionBinder>, request: Request, next: Next) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let scope = parts
        .extensions
        .get::<VersionScope>()
        .cloned()
        .unwrap_or_else(|| VersionScope::new(Arc::clone(&binder.registry)));
    if let Some(tag) = binder.source.extract(&parts, &binder.registry) {
        scope.bind(tag)?;
    }
    tracing::debug!(
        requested = scope.tag().unwrap_or("<unset>"),
        active = scope.active_tag().unwrap_or("<none>"),
        "API version bound"
    );

    parts.extensions.insert(scope);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Extractor exposing the request's [`VersionScope`]
#[derive(Clone)]
pub struct ApiVersion(pub VersionScope);

impl Deref for ApiVersion {
    type Target = VersionScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ApiVersion {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VersionScope>()
            .cloned()
            .map(ApiVersion)
            .ok_or_else(|| ApiError::configuration("ApiVersion used on a route without the bind_version middleware"))
    }
}
