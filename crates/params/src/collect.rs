//! Error collection: extracting a parallel error-only structure from a
//! result tree.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::engine::Outcome;
use crate::error::Messages;

// ============================================================================
// ERROR TREE
// ============================================================================

/// The error-only mirror of an [`Outcome`]: keyed and indexed identically to
/// the source, containing only failing entries. Valid fields and valid list
/// elements are omitted, never represented as empty.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTree {
    /// Messages of one failing field or list element.
    Leaf(Messages),
    /// Failing fields of a nested result, by key.
    Map(IndexMap<String, ErrorTree>),
    /// Failing elements of a list result, by index. Ordered so reports are
    /// stable.
    Indexed(BTreeMap<usize, ErrorTree>),
}

impl ErrorTree {
    /// Looks up a field of a map node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ErrorTree> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Looks up an index of an indexed node.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&ErrorTree> {
        match self {
            Self::Indexed(m) => m.get(&index),
            _ => None,
        }
    }

    /// The messages of a leaf node.
    #[must_use]
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            Self::Leaf(messages) => Some(messages),
            _ => None,
        }
    }

    /// Serializes the tree for API error reporting. Leaves become arrays of
    /// message strings; indexed nodes become objects with stringified index
    /// keys.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Leaf(messages) => serde_json::Value::Array(
                messages
                    .iter()
                    .map(|m| serde_json::Value::String(m.clone()))
                    .collect(),
            ),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Indexed(m) => serde_json::Value::Object(
                m.iter().map(|(i, v)| (i.to_string(), v.to_json())).collect(),
            ),
        }
    }
}

impl serde::Serialize for ErrorTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// COLLECTION
// ============================================================================

/// Extracts every error marker from a result tree.
///
/// Returns `None`, not an empty tree, when the result contains no marker
/// at any depth. Callers rely on exactly this distinction to decide "is the
/// result entirely valid".
#[must_use]
pub fn collect_errors(outcome: &Outcome) -> Option<ErrorTree> {
    match outcome {
        Outcome::Value(_) => None,
        Outcome::Invalid(messages) => Some(ErrorTree::Leaf(messages.clone())),
        Outcome::Map(fields) => {
            let collected: IndexMap<String, ErrorTree> = fields
                .iter()
                .filter_map(|(key, child)| collect_errors(child).map(|e| (key.clone(), e)))
                .collect();
            (!collected.is_empty()).then_some(ErrorTree::Map(collected))
        }
        Outcome::List(items) => {
            let collected: BTreeMap<usize, ErrorTree> = items
                .iter()
                .enumerate()
                .filter_map(|(index, child)| collect_errors(child).map(|e| (index, e)))
                .collect();
            (!collected.is_empty()).then_some(ErrorTree::Indexed(collected))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use smallvec::smallvec;

    fn marker(msg: &str) -> Outcome {
        Outcome::Invalid(smallvec![msg.to_owned()])
    }

    #[test]
    fn test_fully_valid_collects_to_none() {
        let outcome = Outcome::Map(IndexMap::from_iter([
            ("a".to_owned(), Outcome::Value(Value::Int(1))),
            (
                "b".to_owned(),
                Outcome::List(vec![Outcome::Value(Value::str("x"))]),
            ),
        ]));
        assert_eq!(collect_errors(&outcome), None);
    }

    #[test]
    fn test_leaf_errors_keyed_like_source() {
        let outcome = Outcome::Map(IndexMap::from_iter([
            ("name".to_owned(), marker("required")),
            ("age".to_owned(), Outcome::Value(Value::Int(25))),
        ]));
        let errors = collect_errors(&outcome).unwrap();
        assert_eq!(
            errors.get("name").and_then(ErrorTree::messages),
            Some(&["required".to_owned()][..])
        );
        assert_eq!(errors.get("age"), None);
    }

    #[test]
    fn test_list_reports_only_failing_indices() {
        let outcome = Outcome::Map(IndexMap::from_iter([(
            "tags".to_owned(),
            Outcome::List(vec![
                marker("too short"),
                Outcome::Value(Value::str("bb")),
                marker("too short"),
            ]),
        )]));
        let errors = collect_errors(&outcome).unwrap();
        let tags = errors.get("tags").unwrap();
        assert!(tags.at(0).is_some());
        assert_eq!(tags.at(1), None);
        assert!(tags.at(2).is_some());
    }

    #[test]
    fn test_nested_recursion_skips_clean_branches() {
        let outcome = Outcome::Map(IndexMap::from_iter([
            (
                "user".to_owned(),
                Outcome::Map(IndexMap::from_iter([(
                    "email".to_owned(),
                    marker("does not match pattern"),
                )])),
            ),
            (
                "meta".to_owned(),
                Outcome::Map(IndexMap::from_iter([(
                    "ok".to_owned(),
                    Outcome::Value(Value::Bool(true)),
                )])),
            ),
        ]));
        let errors = collect_errors(&outcome).unwrap();
        assert!(errors.get("user").is_some());
        // The entirely-valid nested branch is omitted, not empty.
        assert_eq!(errors.get("meta"), None);
    }

    #[test]
    fn test_to_json_stringifies_indices() {
        let tree = ErrorTree::Indexed(BTreeMap::from_iter([(
            2,
            ErrorTree::Leaf(smallvec!["bad".to_owned()]),
        )]));
        assert_eq!(tree.to_json(), serde_json::json!({"2": ["bad"]}));
    }
}
