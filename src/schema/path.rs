//! Structural paths into the frontmatter tree.

use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A path from the frontmatter root to a nested value.
///
/// Displayed with dots between keys and brackets for indices:
/// `safe-outputs.create-issue.max`, `steps[1].uses`. Keys that themselves
/// contain dots are quoted (`env."A.B"`), so segments never blur together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of a map entry below this path.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Path of a sequence element below this path.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The first key of the path, if the path starts with a key.
    pub fn top_key(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// The last key of the path, if the path ends with a key.
    pub fn last_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Parse the display form back into a path.
    ///
    /// Accepts `a.b[0].c` and quoted keys (`env."A.B"`).
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut chars = text.chars().peekable();
        let mut key = String::new();

        while let Some(ch) = chars.next() {
            match ch {
                '"' => {
                    for inner in chars.by_ref() {
                        if inner == '"' {
                            break;
                        }
                        key.push(inner);
                    }
                }
                '.' => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    let mut digits = String::new();
                    for inner in chars.by_ref() {
                        if inner == ']' {
                            break;
                        }
                        digits.push(inner);
                    }
                    if let Ok(index) = digits.trim().parse() {
                        segments.push(PathSegment::Index(index));
                    }
                }
                _ => key.push(ch),
            }
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    if key.contains('.') || key.contains('[') {
                        write!(f, "\"{}\"", key)?;
                    } else {
                        f.write_str(key)?;
                    }
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_keys_and_indices() {
        let path = FieldPath::root().child("steps").index(1).child("uses");
        assert_eq!(path.to_string(), "steps[1].uses");
    }

    #[test]
    fn display_quotes_dotted_keys() {
        let path = FieldPath::root().child("env").child("A.B");
        assert_eq!(path.to_string(), "env.\"A.B\"");
    }

    #[test]
    fn parse_round_trips_display_form() {
        for text in ["safe-outputs.create-issue.max", "steps[0].run", "env.\"A.B\"", "on"] {
            assert_eq!(FieldPath::parse(text).to_string(), text);
        }
    }

    #[test]
    fn top_and_last_key() {
        let path = FieldPath::parse("engine.max-turns");
        assert_eq!(path.top_key(), Some("engine"));
        assert_eq!(path.last_key(), Some("max-turns"));
        assert!(FieldPath::root().top_key().is_none());
    }
}
