//! Symbol resolution: matching unimported names against the project index.
//!
//! # Matching
//!
//! A reference `r1\..\rn` matches an index entry `e1\..\em` when the entry's
//! trailing `n` segments equal the reference segment by segment. The name to
//! import is then `e1\..\e(m-n+1)`: the namespace prefix plus the reference's
//! own first segment, so the reference keeps working unchanged once the import
//! exists.
//!
//! Entries with `m <= n` are skipped. Such an entry is the reference itself
//! (or a global symbol) and importing it would produce a single-segment
//! `use Foo;`, which PHP rejects as a no-op import.
//!
//! # Tie-break
//!
//! When several entries match, the shallowest import wins, then the
//! lexicographically smallest `\`-joined name. The result never depends on
//! the order in which entries were added to the index.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::base::{FileId, QualifiedName};

// ============================================================================
// SYMBOL INDEX
// ============================================================================

/// One declared class-like symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    /// Fully-qualified name, stored without the leading `\`.
    pub name: QualifiedName,
    /// Declaring file.
    pub file: FileId,
}

impl SymbolEntry {
    pub fn new(name: QualifiedName, file: FileId) -> Self {
        Self { name, file }
    }
}

/// Index into the entries vector.
pub type SymbolIdx = usize;

/// All class-like symbols known to the project.
///
/// Entries live in a single vector and are referenced by position from the
/// lookup maps. Removing a file clears its slots instead of compacting, so
/// the remaining positions stay valid.
#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    entries: Vec<Option<SymbolEntry>>,
    /// Qualified name -> entry indices (a class may be declared twice).
    by_qualified_name: FxHashMap<QualifiedName, Vec<SymbolIdx>>,
    /// Last segment -> entry indices.
    by_short_name: FxHashMap<SmolStr, Vec<SymbolIdx>>,
    /// File -> entry indices.
    by_file: FxHashMap<FileId, Vec<SymbolIdx>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry.
    pub fn insert(&mut self, entry: SymbolEntry) {
        let idx = self.entries.len();
        self.by_qualified_name
            .entry(entry.name.clone())
            .or_default()
            .push(idx);
        self.by_short_name
            .entry(entry.name.last().clone())
            .or_default()
            .push(idx);
        self.by_file.entry(entry.file).or_default().push(idx);
        self.entries.push(Some(entry));
    }

    /// Replace everything declared in `file` with `names`.
    pub fn add_file(&mut self, file: FileId, names: impl IntoIterator<Item = QualifiedName>) {
        self.remove_file(file);
        for name in names {
            self.insert(SymbolEntry::new(name, file));
        }
    }

    /// Remove all entries declared in a file.
    pub fn remove_file(&mut self, file: FileId) {
        let Some(indices) = self.by_file.remove(&file) else {
            return;
        };
        for idx in indices {
            let Some(entry) = self.entries.get_mut(idx).and_then(Option::take) else {
                continue;
            };
            remove_idx(&mut self.by_qualified_name, &entry.name, idx);
            remove_idx(&mut self.by_short_name, entry.name.last(), idx);
        }
    }

    /// Entries with exactly this fully-qualified name.
    pub fn lookup_qualified(&self, name: &QualifiedName) -> Vec<&SymbolEntry> {
        self.collect(self.by_qualified_name.get(name))
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.by_qualified_name.contains_key(name)
    }

    /// Entries whose last segment is `short_name`.
    pub fn lookup_short(&self, short_name: &str) -> Vec<&SymbolEntry> {
        self.collect(self.by_short_name.get(short_name))
    }

    /// Names of entries inside `namespace` (at any depth), relative to it.
    ///
    /// With no namespace every entry is returned unchanged.
    pub fn relative_to<'a>(
        &'a self,
        namespace: Option<&'a QualifiedName>,
    ) -> impl Iterator<Item = QualifiedName> + 'a {
        self.entries().filter_map(move |entry| match namespace {
            Some(ns) if entry.name.len() > ns.len() && entry.name.starts_with(ns) => {
                QualifiedName::from_segments(entry.name.segments()[ns.len()..].iter().cloned())
            }
            Some(_) => None,
            None => Some(entry.name.clone()),
        })
    }

    /// Entries declared in a file.
    pub fn entries_in_file(&self, file: FileId) -> Vec<&SymbolEntry> {
        self.collect(self.by_file.get(&file))
    }

    /// All live entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter().flatten()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }

    fn collect(&self, indices: Option<&Vec<SymbolIdx>>) -> Vec<&SymbolEntry> {
        indices
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.entries.get(idx).and_then(Option::as_ref))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl FromIterator<SymbolEntry> for SymbolIndex {
    fn from_iter<I: IntoIterator<Item = SymbolEntry>>(iter: I) -> Self {
        let mut index = SymbolIndex::new();
        for entry in iter {
            index.insert(entry);
        }
        index
    }
}

fn remove_idx<K, Q>(map: &mut FxHashMap<K, Vec<SymbolIdx>>, key: &Q, idx: SymbolIdx)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(list) = map.get_mut(key) {
        list.retain(|&i| i != idx);
        if list.is_empty() {
            map.remove(key);
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves references against a [`SymbolIndex`].
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self { index }
    }

    /// Every name that would make `reference` resolvable, best first.
    ///
    /// Sorted by segment count then `\`-joined name, without duplicates.
    pub fn candidates(&self, reference: &QualifiedName) -> Vec<QualifiedName> {
        let n = reference.len();
        let mut candidates: Vec<QualifiedName> = self
            .index
            .lookup_short(reference.last())
            .into_iter()
            .filter(|entry| entry.name.len() > n.max(1))
            .filter(|entry| entry.name.ends_with(reference))
            .filter_map(|entry| entry.name.prefix(entry.name.len() - n + 1))
            .collect();

        candidates.sort_by_cached_key(|name| (name.len(), name.joined()));
        candidates.dedup();
        candidates
    }

    /// The preferred import for `reference`, if any entry matches.
    pub fn resolve(&self, reference: &QualifiedName) -> Option<QualifiedName> {
        let candidates = self.candidates(reference);
        trace!(
            reference = %reference,
            candidates = candidates.len(),
            chosen = ?candidates.first(),
            "resolved reference"
        );
        candidates.into_iter().next()
    }
}

/// Resolve each distinct reference, keyed in first-seen order.
pub fn resolve<'r>(
    references: impl IntoIterator<Item = &'r QualifiedName>,
    index: &SymbolIndex,
) -> IndexMap<QualifiedName, Option<QualifiedName>> {
    let resolver = Resolver::new(index);
    let mut resolved = IndexMap::new();
    for reference in references {
        if !resolved.contains_key(reference) {
            resolved.insert(reference.clone(), resolver.resolve(reference));
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn qn(text: &str) -> QualifiedName {
        QualifiedName::parse(text).unwrap()
    }

    fn make_entry(name: &str, file: u32) -> SymbolEntry {
        SymbolEntry::new(qn(name), FileId::new(file))
    }

    fn index_of(names: &[&str]) -> SymbolIndex {
        names.iter().map(|name| make_entry(name, 0)).collect()
    }

    #[test]
    fn test_symbol_index_basic() {
        let index = index_of(&["App\\Models\\User", "App\\Http\\User", "App\\Kernel"]);

        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup_short("User").len(), 2);
        assert_eq!(index.lookup_qualified(&qn("App\\Kernel")).len(), 1);
        assert!(index.contains(&qn("App\\Models\\User")));
        assert!(!index.contains(&qn("User")));
    }

    #[test]
    fn test_symbol_index_remove_file() {
        let mut index = SymbolIndex::new();
        index.add_file(FileId::new(0), [qn("A\\One")]);
        index.add_file(FileId::new(1), [qn("B\\Two")]);
        assert_eq!(index.file_count(), 2);

        index.remove_file(FileId::new(0));

        assert_eq!(index.len(), 1);
        assert!(index.lookup_short("One").is_empty());
        assert_eq!(index.entries().count(), 1);
        assert_eq!(index.entries_in_file(FileId::new(1)).len(), 1);
    }

    #[test]
    fn test_add_file_replaces_previous_entries() {
        let mut index = SymbolIndex::new();
        index.add_file(FileId::new(0), [qn("A\\Old")]);
        index.add_file(FileId::new(0), [qn("A\\New")]);

        assert!(!index.contains(&qn("A\\Old")));
        assert!(index.contains(&qn("A\\New")));
    }

    #[test]
    fn test_relative_to_namespace() {
        let index = index_of(&["App\\Foo", "App\\Sub\\Bar", "Other\\Baz"]);
        let ns = qn("App");
        let names: Vec<_> = index.relative_to(Some(&ns)).map(|n| n.joined()).collect();
        assert_eq!(names, vec!["Foo", "Sub\\Bar"]);
        assert_eq!(index.relative_to(None).count(), 3);
    }

    #[rstest]
    #[case::unqualified("Foo", &["App\\Models\\Foo"], Some("App\\Models\\Foo"))]
    #[case::qualified_keeps_leaf_alias("Models\\Foo", &["App\\Models\\Foo"], Some("App\\Models"))]
    #[case::segment_not_substring("Foo", &["App\\BarFoo"], None)]
    #[case::global_entry_skipped("Foo", &["Foo"], None)]
    #[case::reference_itself_skipped("Models\\Foo", &["Models\\Foo"], None)]
    #[case::shallower_wins("Foo", &["A\\B\\C\\Foo", "Z\\Foo"], Some("Z\\Foo"))]
    #[case::lexicographic_tie_break("X", &["A\\C\\X", "A\\B\\X"], Some("A\\B\\X"))]
    #[case::no_entries("Foo", &[], None)]
    fn test_resolve_cases(
        #[case] reference: &str,
        #[case] entries: &[&str],
        #[case] expected: Option<&str>,
    ) {
        let index = index_of(entries);
        let resolved = Resolver::new(&index).resolve(&qn(reference));
        assert_eq!(resolved.map(|name| name.joined()).as_deref(), expected);
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let index: SymbolIndex = [make_entry("App\\Foo", 0), make_entry("App\\Foo", 1)]
            .into_iter()
            .collect();
        assert_eq!(Resolver::new(&index).candidates(&qn("Foo")), vec![qn("App\\Foo")]);
    }

    #[test]
    fn test_resolve_map_keeps_first_seen_order() {
        let index = index_of(&["App\\Foo", "App\\Bar"]);
        let refs = [qn("Bar"), qn("Missing"), qn("Foo"), qn("Bar")];

        let resolved = resolve(&refs, &index);

        let keys: Vec<_> = resolved.keys().map(|k| k.joined()).collect();
        assert_eq!(keys, vec!["Bar", "Missing", "Foo"]);
        assert_eq!(resolved[&qn("Missing")], None);
        assert_eq!(resolved[&qn("Foo")], Some(qn("App\\Foo")));
    }
}
