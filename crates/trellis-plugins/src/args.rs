//! Normalized argument shapes for `op` invocations.

use serde_json::{Map, Value};

/// Arguments extracted from an `op` request's `param.args` payload.
///
/// The shape is decided once at the dispatch boundary: a JSON array maps
/// to positional arguments and a JSON object maps to keyword arguments.
/// Every other shape is rejected before the plugin is invoked, so op
/// functions only ever see one of these two variants.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    /// Ordered positional arguments.
    Positional(Vec<Value>),
    /// Named keyword arguments.
    Keyword(Map<String, Value>),
}

impl CallArgs {
    /// An empty keyword-argument set, the default when `args` is absent.
    #[must_use]
    pub fn empty() -> Self {
        Self::Keyword(Map::new())
    }

    /// Number of arguments carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Keyword(values) => values.len(),
        }
    }

    /// Returns `true` when no arguments are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument by index, `None` for keyword arguments.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Positional(values) => values.get(index),
            Self::Keyword(_) => None,
        }
    }

    /// Keyword argument by name, `None` for positional arguments.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Positional(_) => None,
            Self::Keyword(values) => values.get(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn positional_accessors() {
        let args = CallArgs::Positional(vec![json!(1), json!("two")]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.positional(1), Some(&json!("two")));
        assert_eq!(args.keyword("two"), None);
    }

    #[test]
    fn keyword_accessors() {
        let mut map = Map::new();
        map.insert("x".to_owned(), json!(1));
        let args = CallArgs::Keyword(map);
        assert_eq!(args.keyword("x"), Some(&json!(1)));
        assert_eq!(args.positional(0), None);
    }

    #[test]
    fn empty_is_keyword_shaped() {
        let args = CallArgs::empty();
        assert!(args.is_empty());
        assert!(matches!(args, CallArgs::Keyword(_)));
    }
}
