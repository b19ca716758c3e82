//! Structural paths into nested form data.
//!
//! A [`Path`] is a sequence of map keys and array indices. [`set_at_path`]
//! never mutates its input: it returns a new root with every container on
//! the path copied, which is what field change handlers rely on.
//!
//! Paths serialize as JSON arrays (`["tasks", 0, "title"]`), which keeps
//! digit-only and dotted keys distinct from indices. The dotted form from
//! `Display`/`FromStr` is for people and schema `refPath`s; it reads every
//! all-digit segment as an index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Value;

/// One step of a [`Path`]. Serializes as a JSON string (key) or number
/// (index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of a value inside a data tree. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Single-key path.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.0.push(PathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(PathSegment::Index(index));
    }

    /// Copy of this path extended by a key.
    #[must_use]
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push_key(key);
        child
    }

    /// Copy of this path extended by an index.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut child = self.clone();
        child.push_index(index);
        child
    }

    /// Path with the last segment removed; `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Error returned when a dotted path string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    #[error("empty segment at position {position} in path {path:?}")]
    EmptySegment { path: String, position: usize },
}

impl FromStr for Path {
    type Err = PathParseError;

    /// Parses `a.0.b`. All-digit segments become indices. The empty string
    /// is the root path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let mut path = Self::root();
        for (position, segment) in s.split('.').enumerate() {
            if segment.is_empty() {
                return Err(PathParseError::EmptySegment {
                    path: s.to_string(),
                    position,
                });
            }
            match segment.parse::<usize>() {
                Ok(index) if segment.bytes().all(|b| b.is_ascii_digit()) => {
                    path.push_index(index);
                }
                _ => path.push_key(segment),
            }
        }
        Ok(path)
    }
}

/// Reads the value at `path`, or `None` when any step is missing.
#[must_use]
pub fn get_at_path<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| match (segment, current) {
            (PathSegment::Key(key), Value::Map(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

/// Returns a copy of `root` with `value` stored at `path`.
///
/// Missing or mismatched intermediate containers are replaced: key segments
/// create maps, index segments create arrays. An index may address an
/// existing element or append one right after the last; a path reaching
/// further leaves `root` unchanged. Setting at the root path returns
/// `value` itself.
#[must_use]
pub fn set_at_path(root: &Value, path: &Path, value: Value) -> Value {
    set_segments(Some(root), path.segments(), value).unwrap_or_else(|| {
        debug!(path = %path, "index past the end of its array; data unchanged");
        root.clone()
    })
}

fn set_segments(current: Option<&Value>, segments: &[PathSegment], value: Value) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    match head {
        PathSegment::Key(key) => {
            let mut map = match current {
                Some(Value::Map(map)) => map.clone(),
                _ => std::collections::BTreeMap::new(),
            };
            let next = set_segments(map.get(key), rest, value)?;
            map.insert(key.clone(), next);
            Some(Value::Map(map))
        }
        PathSegment::Index(index) => {
            let mut items = match current {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            if *index > items.len() {
                return None;
            }
            let next = set_segments(items.get(*index), rest, value)?;
            match items.get_mut(*index) {
                Some(slot) => *slot = next,
                None => items.push(next),
            }
            Some(Value::Array(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn data() -> Value {
        Value::from(json!({
            "title": "Plan",
            "location": {"lat": 1.5, "lng": 2.5},
            "tasks": [{"title": "a"}, {"title": "b"}]
        }))
    }

    #[test]
    fn display_and_parse() {
        let path: Path = "tasks.1.title".parse().expect("parse");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("tasks".into()),
                PathSegment::Index(1),
                PathSegment::Key("title".into()),
            ]
        );
        assert_eq!(path.to_string(), "tasks.1.title");
    }

    #[test]
    fn parse_rejects_empty_segments() {
        let err = "a..b".parse::<Path>().expect_err("empty segment");
        assert_eq!(
            err,
            PathParseError::EmptySegment {
                path: "a..b".into(),
                position: 1
            }
        );
        assert_eq!("".parse::<Path>().expect("root"), Path::root());
    }

    #[test]
    fn get_walks_maps_and_arrays() {
        let root = data();
        let path: Path = "tasks.1.title".parse().expect("parse");
        assert_eq!(get_at_path(&root, &path), Some(&Value::from("b")));
        assert_eq!(get_at_path(&root, &Path::key("missing")), None);
        assert_eq!(get_at_path(&root, &"title.0".parse().expect("parse")), None);
        assert_eq!(get_at_path(&root, &Path::root()), Some(&root));
    }

    #[test]
    fn set_copies_instead_of_mutating() {
        let root = data();
        let path: Path = "location.lat".parse().expect("parse");
        let updated = set_at_path(&root, &path, Value::Float(9.0));

        assert_eq!(get_at_path(&updated, &path), Some(&Value::Float(9.0)));
        assert_eq!(get_at_path(&root, &path), Some(&Value::Float(1.5)));
        assert_eq!(updated.get("title"), root.get("title"));
    }

    #[test]
    fn set_creates_missing_containers() {
        let updated = set_at_path(
            &Value::empty_map(),
            &"tasks.0.title".parse().expect("parse"),
            Value::from("c"),
        );
        assert_eq!(updated, Value::from(json!({"tasks": [{"title": "c"}]})));
    }

    #[test]
    fn set_appends_one_past_the_end() {
        let updated = set_at_path(&data(), &"tasks.2".parse().expect("parse"), Value::Int(7));
        assert_eq!(updated.get("tasks").and_then(Value::as_array).map(<[Value]>::len), Some(3));
        assert_eq!(get_at_path(&updated, &"tasks.2".parse().expect("parse")), Some(&Value::Int(7)));
    }

    #[test]
    fn set_past_the_end_leaves_data_unchanged() {
        let root = data();
        let far: Path = "tasks.5.title".parse().expect("parse");
        assert_eq!(set_at_path(&root, &far, Value::from("x")), root);

        let huge = Path::key("tasks").child_index(usize::MAX);
        assert_eq!(set_at_path(&root, &huge, Value::Int(1)), root);

        let fresh = Path::key("tags").child_index(usize::MAX);
        assert_eq!(set_at_path(&root, &fresh, Value::Int(1)), root);
    }

    #[test]
    fn set_replaces_mismatched_containers() {
        let root = Value::from(json!({"tasks": "oops"}));
        let updated = set_at_path(&root, &"tasks.0".parse().expect("parse"), Value::Int(1));
        assert_eq!(updated, Value::from(json!({"tasks": [1]})));
    }

    #[test]
    fn set_at_root_returns_value() {
        assert_eq!(set_at_path(&data(), &Path::root(), Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn serializes_as_segment_array() {
        let path = Path::key("tasks").child_index(3).child_key("2024");
        let text = serde_json::to_string(&path).expect("serialize");
        assert_eq!(text, r#"["tasks",3,"2024"]"#);
        let back: Path = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, path);
        assert_eq!(serde_json::to_string(&Path::root()).expect("serialize"), "[]");
    }

    #[test]
    fn parent_and_children() {
        let path = Path::key("tasks").child_index(0).child_key("title");
        assert_eq!(path.parent(), Some(Path::key("tasks").child_index(0)));
        assert_eq!(path.last(), Some(&PathSegment::Key("title".into())));
        assert_eq!(Path::root().parent(), None);
    }

    fn segment_strategy() -> impl Strategy<Value = PathSegment> {
        prop_oneof![
            "[a-z][a-z0-9_]{0,6}".prop_map(PathSegment::Key),
            (0usize..5).prop_map(PathSegment::Index),
        ]
    }

    fn any_key_segment_strategy() -> impl Strategy<Value = PathSegment> {
        prop_oneof![
            "[a-z][a-z0-9_]{0,6}".prop_map(PathSegment::Key),
            "[0-9]{1,4}".prop_map(PathSegment::Key),
            "[a-z0-9]{0,3}\\.[a-z0-9.]{0,4}".prop_map(PathSegment::Key),
            any::<usize>().prop_map(PathSegment::Index),
        ]
    }

    proptest! {
        #[test]
        fn display_parse_round_trip(segments in prop::collection::vec(segment_strategy(), 0..6)) {
            let path = Path::from(segments);
            let parsed: Path = path.to_string().parse().expect("parse");
            prop_assert_eq!(parsed, path);
        }

        #[test]
        fn serde_round_trip_keeps_digit_and_dotted_keys(
            segments in prop::collection::vec(any_key_segment_strategy(), 0..6),
        ) {
            let path = Path::from(segments);
            let text = serde_json::to_string(&path).expect("serialize");
            let back: Path = serde_json::from_str(&text).expect("deserialize");
            prop_assert_eq!(back, path);
        }

        #[test]
        fn set_then_get_returns_value(
            segments in prop::collection::vec(segment_strategy(), 1..5),
            n in any::<i64>(),
        ) {
            let path = Path::from(segments);
            let root = data();
            let updated = set_at_path(&root, &path, Value::Int(n));
            if updated != root {
                prop_assert_eq!(get_at_path(&updated, &path), Some(&Value::Int(n)));
            }
            prop_assert_eq!(root, data());
        }
    }
}
