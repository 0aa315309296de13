//! Hierarchical PHP names (`Vendor\Lib\Thing`).

use std::fmt;

use smol_str::SmolStr;

/// How a name is anchored, mirroring PHP's name resolution rules.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum NameKind {
    /// `Foo` - a single segment, resolved against imports and the namespace.
    Unqualified,
    /// `Foo\Bar` - relative; the first segment is resolved like an unqualified name.
    Qualified,
    /// `\Foo\Bar` - absolute, never needs an import.
    FullyQualified,
    /// `namespace\Foo` - explicitly relative to the current namespace.
    Relative,
}

/// An ordered, non-empty sequence of name segments plus its [`NameKind`].
///
/// Immutable once built. Equality and hashing include the kind, so `\Foo`
/// and `Foo` are different names.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct QualifiedName {
    segments: Box<[SmolStr]>,
    kind: NameKind,
}

impl QualifiedName {
    /// Parse a name as written in source.
    ///
    /// Returns `None` for empty input or empty segments (`Foo\\Bar`, `Foo\`).
    pub fn parse(text: &str) -> Option<Self> {
        let (kind, rest) = if let Some(rest) = text.strip_prefix('\\') {
            (NameKind::FullyQualified, rest)
        } else if let Some(rest) = strip_relative_prefix(text) {
            (NameKind::Relative, rest)
        } else {
            (NameKind::Unqualified, text)
        };

        let segments: Vec<SmolStr> = rest.split('\\').map(SmolStr::new).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        let kind = match kind {
            NameKind::Unqualified if segments.len() > 1 => NameKind::Qualified,
            other => other,
        };

        Some(Self {
            segments: segments.into_boxed_slice(),
            kind,
        })
    }

    /// Build a relative name from segments; `None` if there are none.
    ///
    /// The kind is `Unqualified` for one segment and `Qualified` otherwise.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let segments: Box<[SmolStr]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let kind = if segments.len() == 1 {
            NameKind::Unqualified
        } else {
            NameKind::Qualified
        };
        Some(Self { segments, kind })
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> &SmolStr {
        &self.segments[0]
    }

    pub fn last(&self) -> &SmolStr {
        &self.segments[self.segments.len() - 1]
    }

    pub fn is_fully_qualified(&self) -> bool {
        self.kind == NameKind::FullyQualified
    }

    /// Whether an import could bind this name (neither absolute nor `namespace\`).
    pub fn is_importable(&self) -> bool {
        matches!(self.kind, NameKind::Unqualified | NameKind::Qualified)
    }

    /// Segments joined with `\`, without any leading marker.
    pub fn joined(&self) -> String {
        self.segments.join("\\")
    }

    /// The first `n` segments as a relative name.
    pub fn prefix(&self, n: usize) -> Option<Self> {
        Self::from_segments(self.segments.iter().take(n).cloned())
    }

    /// `self` followed by `other`'s segments (used for group imports).
    pub fn join(&self, other: &QualifiedName) -> Self {
        let segments: Box<[SmolStr]> = self
            .segments
            .iter()
            .chain(other.segments.iter())
            .cloned()
            .collect();
        Self {
            segments,
            kind: NameKind::Qualified,
        }
    }

    /// Segment-wise suffix match: `App\Models\Foo` ends with `Models\Foo`.
    pub fn ends_with(&self, suffix: &QualifiedName) -> bool {
        self.segments.ends_with(&suffix.segments)
    }

    /// Segment-wise prefix match.
    pub fn starts_with(&self, prefix: &QualifiedName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

fn strip_relative_prefix(text: &str) -> Option<&str> {
    const PREFIX: &str = "namespace\\";
    let head = text.get(..PREFIX.len())?;
    head.eq_ignore_ascii_case(PREFIX)
        .then(|| &text[PREFIX.len()..])
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedName({})", self)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NameKind::FullyQualified => f.write_str("\\")?,
            NameKind::Relative => f.write_str("namespace\\")?,
            NameKind::Unqualified | NameKind::Qualified => {}
        }
        f.write_str(&self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(QualifiedName::parse("Foo").unwrap().kind(), NameKind::Unqualified);
        assert_eq!(QualifiedName::parse("Foo\\Bar").unwrap().kind(), NameKind::Qualified);
        assert_eq!(
            QualifiedName::parse("\\Foo").unwrap().kind(),
            NameKind::FullyQualified
        );

        let relative = QualifiedName::parse("namespace\\Foo").unwrap();
        assert_eq!(relative.kind(), NameKind::Relative);
        assert_eq!(relative.joined(), "Foo");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(QualifiedName::parse("").is_none());
        assert!(QualifiedName::parse("Foo\\").is_none());
        assert!(QualifiedName::parse("Foo\\\\Bar").is_none());
    }

    #[test]
    fn test_display_keeps_anchor() {
        assert_eq!(QualifiedName::parse("\\A\\B").unwrap().to_string(), "\\A\\B");
        assert_eq!(QualifiedName::parse("\\A\\B").unwrap().joined(), "A\\B");
    }

    #[test]
    fn test_segment_suffix_is_not_substring() {
        let entry = QualifiedName::parse("App\\BarFoo").unwrap();
        let reference = QualifiedName::parse("Foo").unwrap();
        assert!(!entry.ends_with(&reference));

        let entry = QualifiedName::parse("App\\Models\\Foo").unwrap();
        assert!(entry.ends_with(&QualifiedName::parse("Models\\Foo").unwrap()));
    }

    #[test]
    fn test_prefix_and_join() {
        let name = QualifiedName::parse("App\\Models\\Foo").unwrap();
        assert_eq!(name.prefix(2).unwrap().joined(), "App\\Models");
        assert!(name.prefix(0).is_none());

        let group = QualifiedName::parse("App").unwrap();
        let item = QualifiedName::parse("Models\\Foo").unwrap();
        assert_eq!(group.join(&item), name);
    }
}
