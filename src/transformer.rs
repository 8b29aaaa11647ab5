//! Output transformers
//!
//! A transformer shapes one item for the wire. Transformers are usually registered per API
//! version and resolved through a [`VersionScope`](crate::versioning::VersionScope), so that
//! `v1` and `v2` clients receive different representations of the same records.

use serde::Serialize;
use serde_json::Value;

pub trait Transformer<T: ?Sized>: Send + Sync {
    fn transform(&self, item: &T) -> Value;
}

impl<T: ?Sized, F> Transformer<T> for F
where
    F: Fn(&T) -> Value + Send + Sync,
{
    fn transform(&self, item: &T) -> Value {
        self(item)
    }
}

/// Emits the serde representation unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeTransformer;

impl<T: Serialize + ?Sized> Transformer<T> for SerdeTransformer {
    fn transform(&self, item: &T) -> Value {
        serde_json::to_value(item).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize item");
            Value::Null
        })
    }
}

#[must_use]
pub fn transform_all<T>(items: &[T], transformer: &dyn Transformer<T>) -> Vec<Value> {
    items.iter().map(|item| transformer.transform(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Post {
        id: i32,
        title: String,
    }

    #[test]
    fn test_closure_transformer() {
        let upper = |post: &Post| json!({"headline": post.title.to_uppercase()});
        let post = Post {
            id: 1,
            title: "hello".to_string(),
        };
        assert_eq!(upper.transform(&post), json!({"headline": "HELLO"}));
    }

    #[test]
    fn test_serde_transformer_and_transform_all() {
        let posts = vec![
            Post {
                id: 1,
                title: "a".to_string(),
            },
            Post {
                id: 2,
                title: "b".to_string(),
            },
        ];
        let values = transform_all(&posts, &SerdeTransformer);
        assert_eq!(values, vec![json!({"id": 1, "title": "a"}), json!({"id": 2, "title": "b"})]);
    }
}
