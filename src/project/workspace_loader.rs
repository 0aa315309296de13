//! Building the project's symbol index.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::{ImportsConfig, ProjectError, load_classmap};
use crate::base::QualifiedName;
use crate::hir::{SourceRoot, SymbolEntry, SymbolIndex};
use crate::syntax::{SourceFile, StmtKind, parse};

/// Declaring files plus the classes they declare.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    pub files: SourceRoot,
    pub symbols: SymbolIndex,
}

impl ProjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` declares `name`.
    pub fn insert(&mut self, name: QualifiedName, path: impl Into<PathBuf>) {
        let file = self.files.insert(path);
        self.symbols.insert(SymbolEntry::new(name, file));
    }
}

/// The classmap when enabled and present, otherwise a scan of the
/// configured source directories.
pub fn load_index(root: &Path, config: &ImportsConfig) -> Result<ProjectIndex, ProjectError> {
    if config.classmap {
        if let Some(entries) = load_classmap(root)? {
            let mut index = ProjectIndex::new();
            for (name, path) in entries {
                index.insert(name, path);
            }
            return Ok(index);
        }
    }
    scan_workspace(root, &config.source_dirs)
}

/// Parse every `.php` file under `root/<dir>` in parallel and index the
/// class-likes each declares.
///
/// Files that fail to read or parse are skipped with a warning. Files are
/// numbered in path order, so the result does not depend on thread timing.
pub fn scan_workspace(root: &Path, dirs: &[PathBuf]) -> Result<ProjectIndex, ProjectError> {
    let mut paths = Vec::new();
    for dir in dirs {
        let dir = root.join(dir);
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir).into_iter().filter_entry(|e| !is_excluded(e)) {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
                ProjectError::io(path, e.into())
            })?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "php") {
                paths.push(entry.into_path());
            }
        }
    }
    paths.sort();
    paths.dedup();

    let declared: Vec<(PathBuf, Vec<QualifiedName>)> = paths
        .into_par_iter()
        .filter_map(|path| {
            let names = scan_file(&path)?;
            Some((path, names))
        })
        .collect();

    let mut index = ProjectIndex::new();
    for (path, names) in declared {
        let file = index.files.insert(path);
        index.symbols.add_file(file, names);
    }
    debug!(
        files = index.files.len(),
        symbols = index.symbols.len(),
        "scanned workspace"
    );
    Ok(index)
}

fn scan_file(path: &Path) -> Option<Vec<QualifiedName>> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };
    match parse(&source) {
        Ok(file) => Some(declared_classes(&file)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unparsable file");
            None
        }
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "vendor" || name == "node_modules")
}

/// Fully-qualified names of the named class-likes declared at the top level
/// of a file or of its namespaces.
pub fn declared_classes(file: &SourceFile) -> Vec<QualifiedName> {
    let mut names = Vec::new();
    for stmt in &file.stmts {
        match &stmt.kind {
            StmtKind::Namespace(ns) => {
                let prefix = ns.name.as_ref().map(|name| &name.name);
                for stmt in &ns.stmts {
                    push_class(&stmt.kind, prefix, &mut names);
                }
            }
            kind => push_class(kind, None, &mut names),
        }
    }
    names
}

fn push_class(kind: &StmtKind, prefix: Option<&QualifiedName>, names: &mut Vec<QualifiedName>) {
    let StmtKind::ClassLike(class) = kind else {
        return;
    };
    let Some(short) = &class.name else {
        return;
    };
    let Some(short) = QualifiedName::parse(short) else {
        return;
    };
    names.push(match prefix {
        Some(prefix) => prefix.join(&short),
        None => short,
    });
}
