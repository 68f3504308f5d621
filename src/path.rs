//! Structured attribute paths.
//!
//! A path names one position inside a state or config value, e.g.
//! `nic.0.ip.1.public_ip`. Conversions extend the path as they descend so
//! that diagnostics point at the offending field and so the prior state can
//! be consulted at the same position.

use std::fmt;

use serde_json::Value;

/// One step of an [`AttrPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named attribute or block.
    Field(String),
    /// A position inside a list or set.
    Index(usize),
}

/// A path from the root of a resource to a nested value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttrPath {
    segments: Vec<PathSegment>,
}

impl AttrPath {
    /// The empty path, pointing at the resource itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path with a field name.
    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.into()));
        Self { segments }
    }

    /// Extend the path with a list index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve the path inside `value`.
    ///
    /// Returns `None` if any step is missing or has the wrong shape. A
    /// `null` at the end of the path also resolves to `None`.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Field(name), Value::Object(map)) => map.get(name)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        let path = AttrPath::root().field("nic").index(0).field("ip").index(1);
        assert_eq!(path.to_string(), "nic.0.ip.1");
        assert_eq!(path.depth(), 4);
        assert_eq!(AttrPath::root().to_string(), "");
        assert!(AttrPath::root().is_root());
    }

    #[test]
    fn test_lookup() {
        let state = json!({
            "summary_address": [
                {"id": 1, "prefix": "10.0.0.0/24"},
                {"id": 2, "prefix": null}
            ]
        });

        let prefix = AttrPath::root()
            .field("summary_address")
            .index(0)
            .field("prefix");
        assert_eq!(prefix.lookup(&state), Some(&json!("10.0.0.0/24")));

        let null_prefix = AttrPath::root()
            .field("summary_address")
            .index(1)
            .field("prefix");
        assert_eq!(null_prefix.lookup(&state), None);

        let out_of_range = AttrPath::root().field("summary_address").index(5);
        assert_eq!(out_of_range.lookup(&state), None);

        let wrong_shape = AttrPath::root().field("summary_address").field("id");
        assert_eq!(wrong_shape.lookup(&state), None);
    }
}
