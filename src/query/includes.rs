use std::collections::BTreeMap;

/// Relation paths to eager-load, stored as a tree.
///
/// `posts.comments` inserts both `posts` and `posts > comments`, and repeated or overlapping
/// paths collapse into one node per relation. A loader therefore walks the tree once and issues
/// a single batched query per level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Includes {
    children: BTreeMap<String, Includes>,
}

impl Includes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dot-notation path. Empty segments are skipped.
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    #[must_use]
    pub fn contains(&self, relation: &str) -> bool {
        self.children.contains_key(relation)
    }

    /// Nested relations requested below `relation`
    #[must_use]
    pub fn get(&self, relation: &str) -> Option<&Includes> {
        self.children.get(relation)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Top-level relation names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Every node as a full dot path, parents before children
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, child) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            out.push(path.clone());
            child.collect_paths(&path, out);
        }
    }
}

impl<'a> FromIterator<&'a str> for Includes {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut includes = Self::new();
        for path in iter {
            includes.insert(path);
        }
        includes
    }
}
