use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Range;

/// Separator between the components of a [`Section`] path.
pub const PATH_SEPARATOR: char = '.';

/// A value stored against a key in a binary section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypedValue {
    String(String),
    Int32(i32),
    Int64(i64),
}
impl TypedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer representation, without looking inside strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(i) => Some(i64::from(*i)),
            Self::Int64(i) => Some(*i),
            Self::String(_) => None,
        }
    }

    /// Integer representation, parsing numeric strings as well.
    ///
    /// The store is inconsistent about whether numbers are written as
    /// integers or as decimal strings, so most consumers want this.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::String(s) => s.trim().parse().ok(),
            _ => self.as_i64(),
        }
    }
}
impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}
impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl Display for TypedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Int32(i) => write!(f, "{i}"),
            Self::Int64(i) => write!(f, "{i}"),
        }
    }
}

/// One named, nested section of a binary KeyValues blob.
///
/// Pairs keep their declaration order; lookups return the first match.
/// Section names may themselves contain dots, so the path is kept as a list
/// of components and only joined for display.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    components: Vec<String>,
    extent: Range<usize>,
    pairs: Vec<(String, TypedValue)>,
}
impl Section {
    /// A section at a dot-separated `path`. Use
    /// [`from_components`](Self::from_components) when names contain dots.
    pub fn new(path: &str) -> Self {
        Self::from_components(path.split(PATH_SEPARATOR))
    }

    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_extent(components.into_iter().map(Into::into).collect(), 0..0)
    }

    pub(crate) fn with_extent(components: Vec<String>, extent: Range<usize>) -> Self {
        Self {
            components,
            extent,
            pairs: Vec::new(),
        }
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<TypedValue>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub(crate) fn close(&mut self, end: usize) {
        self.extent.end = end.max(self.extent.start);
    }

    /// Dot-joined path, starting with the blob's root section name.
    ///
    /// Ambiguous when a name contains a dot; match on
    /// [`components`](Self::components) instead.
    pub fn path(&self) -> String {
        self.components.join(&PATH_SEPARATOR.to_string())
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Byte range of the section body within the blob it was parsed from,
    /// from just after its name to its end token.
    pub fn extent(&self) -> Range<usize> {
        self.extent.clone()
    }

    /// The raw body bytes, given the blob this section was parsed from.
    pub fn raw<'b>(&self, blob: &'b [u8]) -> Option<&'b [u8]> {
        blob.get(self.extent())
    }

    pub fn pairs(&self) -> &[(String, TypedValue)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First value stored under `key` (ASCII case-insensitive).
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.pairs.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(TypedValue::as_str)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(TypedValue::to_integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TypedValue::Int32(64), Some(64))]
    #[case(TypedValue::Int64(-3), Some(-3))]
    #[case(TypedValue::from(" 64 "), Some(64))]
    #[case(TypedValue::from("sixty-four"), None)]
    fn to_integer(#[case] value: TypedValue, #[case] expected: Option<i64>) {
        assert_eq!(value.to_integer(), expected);
    }

    #[test]
    fn first_match_wins() {
        let section = Section::new("appinfo.common").with("Name", "first").with("name", "second");
        assert_eq!(section.get_str("name"), Some("first"));
        assert_eq!(section.name(), "common");
        assert_eq!(section.depth(), 2);
    }

    #[test]
    fn dotted_names_stay_whole() {
        let section = Section::from_components(["440", "depots", "branches", "1.2.3"]);
        assert_eq!(section.name(), "1.2.3");
        assert_eq!(section.depth(), 4);
        assert_eq!(section.components().collect::<Vec<_>>(), ["440", "depots", "branches", "1.2.3"]);
        assert_eq!(section.path(), "440.depots.branches.1.2.3");
    }

    #[test]
    fn raw_respects_extent() {
        let mut section = Section::with_extent(vec!["a".to_string()], 2..2);
        section.close(4);
        assert_eq!(section.raw(b"abcdef"), Some(&b"cd"[..]));
        assert_eq!(section.raw(b"abc"), None);
    }
}
