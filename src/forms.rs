//! # Form Descriptions
//!
//! Describes a backend form (target, layout, buttons, sections and fields) so that a frontend
//! can render it generically:
//!
//! ```json
//! {
//!   "form": {"id": "...", "layout": "...", "method": "...", "url": "...", "redirect_url": "...",
//!            "headers": {}, "buttons": {}, "settings": {}, "values": {}, "errors": {}},
//!   "sections": [{"id": "...", "label": "...", "description": "...",
//!                 "fields": [{"id": "...", "type": "...", "name": "...", "label": "...", "hint": "...", "settings": {}}]}]
//! }
//! ```
//!
//! Every key is always present; unset labels, hints and the redirect target are `null`.
//!
//! Two encoders are provided. [`FormDocument::to_json`] keeps empty collections as `{}`, which
//! JavaScript consumers expect; [`FormDocument::to_array`] renders them as `[]`, for consumers
//! that cannot tell an empty map from an empty list.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::validation::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub id: String,
    pub layout: String,
    pub method: String,
    pub url: String,
    pub redirect_url: Option<String>,
    pub headers: Map<String, Value>,
    pub buttons: Map<String, Value>,
    pub settings: Map<String, Value>,
    pub values: Map<String, Value>,
    pub errors: Map<String, Value>,
}

impl Form {
    /// A vertical `POST` form submitting to `url`
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layout: "vertical".to_string(),
            method: "POST".to_string(),
            url: url.into(),
            redirect_url: None,
            headers: Map::new(),
            buttons: Map::new(),
            settings: Map::new(),
            values: Map::new(),
            errors: Map::new(),
        }
    }

    #[must_use]
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_uppercase();
        self
    }

    #[must_use]
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn button(mut self, name: impl Into<String>, label: impl Into<Value>) -> Self {
        self.buttons.insert(name.into(), label.into());
        self
    }

    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Prefill every field from a serializable object (e.g. the record being edited)
    #[must_use]
    pub fn values_from<T: Serialize>(mut self, record: &T) -> Self {
        match serde_json::to_value(record) {
            Ok(Value::Object(values)) => self.values.extend(values),
            Ok(_) => tracing::warn!(form = %self.id, "Form values are not an object; ignoring"),
            Err(e) => tracing::error!(form = %self.id, error = %e, "Failed to serialize form values"),
        }
        self
    }

    /// Field → messages, as produced by a failed submission
    #[must_use]
    pub fn errors_from(mut self, errors: &ValidationErrors) -> Self {
        for (field, messages) in errors.by_field() {
            self.errors.insert(field, messages.into());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub label: Option<String>,
    pub hint: Option<String>,
    pub settings: Map<String, Value>,
}

impl Field {
    /// The submitted name defaults to the id
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: kind.into(),
            label: None,
            hint: None,
            settings: Map::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDocument {
    pub form: Form,
    pub sections: Vec<Section>,
}

impl FormDocument {
    #[must_use]
    pub fn new(form: Form) -> Self {
        Self {
            form,
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// JSON-safe encoding: empty collections stay `{}`
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!(form = %self.form.id, error = %e, "Failed to serialize form");
            Value::Null
        })
    }

    /// Plain-array encoding: every empty collection becomes `[]`
    #[must_use]
    pub fn to_array(&self) -> Value {
        empty_objects_as_arrays(self.to_json())
    }
}

impl IntoResponse for FormDocument {
    fn into_response(self) -> Response {
        Json(self.to_json()).into_response()
    }
}

fn empty_objects_as_arrays(value: Value) -> Value {
    match value {
        Value::Object(map) if map.is_empty() => Value::Array(Vec::new()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, empty_objects_as_arrays(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(empty_objects_as_arrays).collect()),
        other => other,
    }
}
