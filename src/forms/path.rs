//! Structured addresses of form values.
//!
//! Composite fields store nested objects and arrays inside the form values.
//! A [`FieldPath`] names one position in that tree as a list of segments and
//! has a textual form used as the key for errors and touched flags:
//!
//! ```text
//! address.city
//! guardians[1].contact.email
//! ["odd.key"].value
//! ```

use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::core::HalError;

/// One step into a JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Ordered segments from the root of the form values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Single-key path for a top-level property.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.segments.push(PathSegment::Key(key.into()));
        path
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.segments.push(PathSegment::Index(index));
        path
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Value at this path, if every step exists.
    #[must_use]
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(root, |current, segment| match segment {
            PathSegment::Key(key) => current.as_object()?.get(key),
            PathSegment::Index(index) => current.as_array()?.get(*index),
        })
    }

    /// Write `value` at this path, creating objects and arrays on the way.
    ///
    /// Intermediate values of the wrong shape are replaced. An index may
    /// address an existing item or append one directly after the last;
    /// anything further out leaves `root` untouched and returns `false`.
    pub fn set(&self, root: &mut Value, value: Value) -> bool {
        if !self.reachable(root) {
            return false;
        }
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(key) => {
                    if !current.is_object() {
                        *current = Value::Object(Map::new());
                    }
                    match current {
                        Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                        _ => return false,
                    }
                }
                PathSegment::Index(index) => {
                    if !current.is_array() {
                        *current = Value::Array(Vec::new());
                    }
                    match current {
                        Value::Array(items) => {
                            if items.len() == *index {
                                items.push(Value::Null);
                            }
                            match items.get_mut(*index) {
                                Some(item) => item,
                                None => return false,
                            }
                        }
                        _ => return false,
                    }
                }
            };
        }
        *current = value;
        true
    }

    /// Whether every index along the path is at most one past its array's end.
    fn reachable(&self, root: &Value) -> bool {
        let mut current = Some(root);
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(key) => current.and_then(Value::as_object).and_then(|map| map.get(key)),
                PathSegment::Index(index) => {
                    let items = current.and_then(Value::as_array);
                    if *index > items.map_or(0, Vec::len) {
                        return false;
                    }
                    items.and_then(|items| items.get(*index))
                }
            };
        }
        true
    }

    /// Remove and return the value at this path. Array removal shifts later items.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let (last, parent) = self.segments.split_last()?;
        let parent = Self {
            segments: parent.to_vec(),
        };
        let container = parent.get_mut(root)?;
        match (last, container) {
            (PathSegment::Key(key), Value::Object(map)) => map.remove(key),
            (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    fn get_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        self.segments.iter().try_fold(root, |current, segment| match segment {
            PathSegment::Key(key) => current.as_object_mut()?.get_mut(key),
            PathSegment::Index(index) => current.as_array_mut()?.get_mut(*index),
        })
    }

    /// If `self` lies under `list[index]` with `index > removed`, the same
    /// path with that index decremented. Paths under `list[removed]` yield
    /// `None`; paths elsewhere are returned unchanged.
    #[must_use]
    pub fn after_removal(&self, list: &Self, removed: usize) -> Option<Self> {
        if !self.starts_with(list) {
            return Some(self.clone());
        }
        let depth = list.segments.len();
        match self.segments.get(depth) {
            Some(PathSegment::Index(i)) if *i == removed => None,
            Some(PathSegment::Index(i)) if *i > removed => {
                let mut shifted = self.clone();
                shifted.segments[depth] = PathSegment::Index(i - 1);
                Some(shifted)
            }
            _ => Some(self.clone()),
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(|c| matches!(c, '.' | '[' | ']' | '"' | '\\'))
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => {
                    if position > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Key(key) => {
                    f.write_str("[\"")?;
                    for c in key.chars() {
                        if matches!(c, '"' | '\\') {
                            f.write_char('\\')?;
                        }
                        f.write_char(c)?;
                    }
                    f.write_str("\"]")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| HalError::Other {
            message: format!("invalid field path '{s}': {reason}"),
        };

        let mut segments = Vec::new();
        let mut chars = s.chars().peekable();
        let mut expect_key = true;

        while let Some(&c) = chars.peek() {
            match c {
                '.' => {
                    chars.next();
                    if expect_key {
                        return Err(invalid("empty key"));
                    }
                    expect_key = true;
                }
                '[' => {
                    chars.next();
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        let mut key = String::new();
                        loop {
                            match chars.next() {
                                Some('\\') => match chars.next() {
                                    Some(escaped) => key.push(escaped),
                                    None => return Err(invalid("dangling escape")),
                                },
                                Some('"') => break,
                                Some(other) => key.push(other),
                                None => return Err(invalid("unterminated key")),
                            }
                        }
                        if chars.next() != Some(']') {
                            return Err(invalid("expected ']'"));
                        }
                        segments.push(PathSegment::Key(key));
                    } else {
                        let mut digits = String::new();
                        loop {
                            match chars.next() {
                                Some(']') => break,
                                Some(d) => digits.push(d),
                                None => return Err(invalid("expected ']'")),
                            }
                        }
                        let index = digits.parse().map_err(|_| invalid("bad index"))?;
                        segments.push(PathSegment::Index(index));
                    }
                    expect_key = false;
                }
                _ => {
                    if !expect_key {
                        return Err(invalid("expected '.'"));
                    }
                    let mut key = String::new();
                    while let Some(&k) = chars.peek() {
                        if k == '.' || k == '[' {
                            break;
                        }
                        if matches!(k, ']' | '"' | '\\') {
                            return Err(invalid("unexpected character"));
                        }
                        key.push(k);
                        chars.next();
                    }
                    segments.push(PathSegment::Key(key));
                    expect_key = false;
                }
            }
        }

        if expect_key && !segments.is_empty() {
            return Err(invalid("trailing '.'"));
        }
        Ok(Self {
            segments,
        })
    }
}
