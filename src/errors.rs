//! # Error Handling
//!
//! Every failure raised by the pipeline, the repositories, settings or route binding is an
//! [`ApiError`]. Rendering an `ApiError` through axum produces one fixed JSON envelope:
//!
//! ```json
//! {"error": {"message": "...", "original_message": "...", "code": "dotted.error.code", "meta": {}}}
//! ```
//!
//! Validation failures use the same envelope and carry `meta.errors`, a field → messages map.
//!
//! ## Philosophy
//!
//! **Never expose internal errors to users**. Database errors and configuration mistakes are
//! logged server-side with `tracing` and replaced by a generic message in the response.
//!
//! ## Localization
//!
//! `message` and `original_message` are identical when an error is rendered on its own. The
//! [`localize_errors`](crate::localization::localize_errors) middleware re-renders the envelope
//! with a translated `message`, keeping `original_message` untouched.
//!
//! ```rust,ignore
//! use api_toolkit::{ApiError, DomainError};
//! use axum::http::StatusCode;
//!
//! async fn show(id: String) -> Result<Json<Post>, ApiError> {
//!     Err(DomainError::new(StatusCode::NOT_FOUND, "posts.not_found", "Post not found")
//!         .with_translation_key("errors.posts.not_found")
//!         .with_meta("id", id)
//!         .into())
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const CODE_NOT_FOUND: &str = "resource.not_found";
pub const CODE_BAD_REQUEST: &str = "request.invalid";
pub const CODE_VALIDATION: &str = "validation.failed";
pub const CODE_CONFIGURATION: &str = "server.misconfigured";
pub const CODE_DATABASE: &str = "server.database";
pub const CODE_INTERNAL: &str = "server.internal";

/// A failure specific to the application domain, carrying its own status, dotted code and
/// translatable message.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainError {
    pub status: StatusCode,
    /// Machine-readable dotted code, e.g. `posts.not_found`
    pub code: String,
    /// Untranslated message
    pub message: String,
    /// Key looked up by the translator; the code is used when absent
    pub translation_key: Option<String>,
    pub meta: Map<String, Value>,
}

impl DomainError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            translation_key: None,
            meta: Map::new(),
        }
    }

    #[must_use]
    pub fn with_translation_key(mut self, key: impl Into<String>) -> Self {
        self.translation_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - no record matches a lookup
    NotFound {
        /// Resource type (e.g., "post", "user")
        resource: String,
        /// Key that was looked up
        id: Option<String>,
    },

    /// Application-defined failure with its own code and status
    Domain(DomainError),

    /// 400 Bad Request - malformed request
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - a filter, setting or payload value was rejected
    ValidationFailed {
        /// Field name → messages
        errors: BTreeMap<String, Vec<String>>,
    },

    /// 500 Internal Server Error - programmer error in resource or version declarations
    Configuration {
        /// Details (logged, not sent to user)
        details: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    // ============================================================================
    // Constructors
    // ============================================================================

    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 422 error from a complete field → messages map
    pub fn validation_failed(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a 422 error for a single field
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::invalid_field("published", "The published filter must be a boolean"));
    /// ```
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::ValidationFailed { errors }
    }

    pub fn configuration(details: impl Into<String>) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Domain(domain) => domain.status,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Configuration { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Dotted machine-readable code
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound { .. } => CODE_NOT_FOUND,
            Self::Domain(domain) => &domain.code,
            Self::BadRequest { .. } => CODE_BAD_REQUEST,
            Self::ValidationFailed { .. } => CODE_VALIDATION,
            Self::Configuration { .. } => CODE_CONFIGURATION,
            Self::Database { .. } => CODE_DATABASE,
            Self::Internal { .. } => CODE_INTERNAL,
        }
    }

    /// Key handed to the translator
    #[must_use]
    pub fn translation_key(&self) -> &str {
        match self {
            Self::Domain(DomainError {
                translation_key: Some(key),
                ..
            }) => key,
            _ => self.code(),
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::Domain(domain) => domain.message.clone(),
            Self::BadRequest { message } => message.clone(),
            Self::ValidationFailed { errors } => {
                let messages: Vec<&str> = errors.values().flatten().map(String::as_str).collect();
                if messages.len() == 1 {
                    messages[0].to_string()
                } else {
                    "The given data was invalid".to_string()
                }
            }
            Self::Configuration { .. } => "A server configuration error occurred".to_string(),
            Self::Database { message, .. } | Self::Internal { message, .. } => message.clone(),
        }
    }

    #[must_use]
    pub fn meta(&self) -> Map<String, Value> {
        match self {
            Self::Domain(domain) => domain.meta.clone(),
            Self::ValidationFailed { errors } => {
                let mut meta = Map::new();
                meta.insert(
                    "errors".to_string(),
                    serde_json::to_value(errors).unwrap_or_default(),
                );
                meta
            }
            _ => Map::new(),
        }
    }

    /// Build the response envelope. `translated` replaces `message` when present;
    /// `original_message` always holds the untranslated text.
    #[must_use]
    pub fn envelope(&self, translated: Option<String>) -> ErrorEnvelope {
        let original = self.user_message();
        ErrorEnvelope {
            error: ErrorBody {
                message: translated.unwrap_or_else(|| original.clone()),
                original_message: original,
                code: self.code().to_string(),
                meta: self.meta(),
            },
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Configuration { details } => {
                tracing::error!(details = %details, "Resource configuration error");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    code = %self.code(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Wire shape of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub original_message: String,
    pub code: String,
    pub meta: Map<String, Value>,
}

/// Attached to error responses so that [`localize_errors`](crate::localization::localize_errors)
/// can re-render the body with a translated message.
#[derive(Debug, Clone)]
pub(crate) struct RenderedError {
    pub(crate) translation_key: String,
    pub(crate) envelope: ErrorEnvelope,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let envelope = self.envelope(None);
        let rendered = RenderedError {
            translation_key: self.translation_key().to_string(),
            envelope: envelope.clone(),
        };

        let mut response = (status, Json(envelope)).into_response();
        response.extensions_mut().insert(rendered);
        response
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

/// Convert SeaORM `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - All other `DbErr` variants → 500 (logged internally, sanitized for users)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}
