//! # Error Localization
//!
//! [`localize_errors`] negotiates the request locale from `Accept-Language` and, when the
//! response is a rendered [`ApiError`](crate::ApiError), replaces the envelope's `message` with
//! the translation of the error's key. `original_message` always keeps the untranslated text,
//! and errors without a translation are left untouched.
//!
//! ```rust,ignore
//! let translator = StaticTranslator::new()
//!     .with("de", "resource.not_found", "Eintrag nicht gefunden")
//!     .with("de", "errors.posts.archived", "Beitrag archiviert");
//!
//! let app = Router::new()
//!     .route("/posts/{post}", get(show))
//!     .layer(middleware::from_fn_with_state(
//!         Localizer::new(Arc::new(translator), ["en", "de"], "en"),
//!         localize_errors,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderValue,
        header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE, CONTENT_LENGTH},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use crate::errors::RenderedError;

pub trait Translator: Send + Sync {
    /// Message for `key` in `locale`, if one exists
    fn translate(&self, key: &str, locale: &str) -> Option<String>;
}

impl<F> Translator for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn translate(&self, key: &str, locale: &str) -> Option<String> {
        self(key, locale)
    }
}

/// In-memory `(locale, key) → message` table
#[derive(Debug, Clone, Default)]
pub struct StaticTranslator {
    messages: HashMap<(String, String), String>,
}

impl StaticTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, locale: impl Into<String>, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert((locale.into(), key.into()), message.into());
        self
    }
}

impl Translator for StaticTranslator {
    fn translate(&self, key: &str, locale: &str) -> Option<String> {
        self.messages
            .get(&(locale.to_string(), key.to_string()))
            .cloned()
    }
}

/// Pick the best supported locale for an `Accept-Language` header.
///
/// Ranges are tried by descending quality; a range matches a supported locale exactly or by
/// primary subtag (`de-CH` → `de`). Falls back to `fallback`.
#[must_use]
pub fn negotiate_locale(header: Option<&str>, supported: &[String], fallback: &str) -> String {
    let mut ranges: Vec<(&str, f32)> = header
        .unwrap_or_default()
        .split(',')
        .filter_map(|range| {
            let mut parts = range.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then_some((tag, quality))
        })
        .collect();
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (tag, _) in ranges {
        let primary = tag.split('-').next().unwrap_or(tag);
        if let Some(found) = supported
            .iter()
            .find(|locale| locale.eq_ignore_ascii_case(tag))
            .or_else(|| supported.iter().find(|locale| locale.eq_ignore_ascii_case(primary)))
        {
            return found.clone();
        }
    }
    fallback.to_string()
}

/// Negotiated locale of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Locale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Locale>()
            .cloned()
            .unwrap_or_else(|| Locale(DEFAULT_LOCALE.to_string())))
    }
}

pub const DEFAULT_LOCALE: &str = "en";

/// State of the [`localize_errors`] middleware
#[derive(Clone)]
pub struct Localizer {
    translator: Arc<dyn Translator>,
    supported: Vec<String>,
    fallback: String,
}

impl Localizer {
    pub fn new<L: Into<String>>(
        translator: Arc<dyn Translator>,
        supported: impl IntoIterator<Item = L>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            supported: supported.into_iter().map(Into::into).collect(),
            fallback: fallback.into(),
        }
    }

    #[must_use]
    pub fn locale_for(&self, accept_language: Option<&str>) -> String {
        negotiate_locale(accept_language, &self.supported, &self.fallback)
    }
}

/// Middleware translating error envelopes. Use with `axum::middleware::from_fn_with_state`.
pub async fn localize_errors(State(localizer): State<Localizer>, mut request: Request, next: Next) -> Response {
    let accept = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    let locale = localizer.locale_for(accept);
    request.extensions_mut().insert(Locale(locale.clone()));

    let mut response = next.run(request).await;

    let Some(rendered) = response.extensions().get::<RenderedError>().cloned() else {
        return response;
    };
    let Some(translated) = localizer.translator.translate(&rendered.translation_key, &locale) else {
        tracing::trace!(key = %rendered.translation_key, locale = %locale, "No translation for error");
        return response;
    };

    let mut envelope = rendered.envelope;
    envelope.error.message = translated;
    match serde_json::to_vec(&envelope) {
        Ok(body) => {
            *response.body_mut() = Body::from(body);
            response.headers_mut().remove(CONTENT_LENGTH);
            if let Ok(value) = HeaderValue::from_str(&locale) {
                response.headers_mut().insert(CONTENT_LANGUAGE, value);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to re-render localized error");
        }
    }
    response
}
