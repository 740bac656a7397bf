//! Scoped name resolution for type names, extendees and option names.

use std::collections::HashSet;

use crate::descriptor::{PoolData, Symbol};

/// What a lookup from the file being built may see: the file itself, its
/// imports and whatever those publicly re-export.
#[derive(Debug, Default)]
pub(super) struct Visibility {
    pub(super) file: usize,
    pub(super) dependencies: HashSet<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LookupMode {
    /// Skip non-type symbols that shadow a type of the same name.
    Types,
    All,
}

/// Symbol storage a lookup runs against. Implementations may load missing
/// symbols from elsewhere before answering.
pub(super) trait SymbolTable {
    fn data(&self) -> &PoolData;

    fn visibility(&self) -> &Visibility;

    fn find_not_enforcing_deps(&mut self, name: &str) -> Option<Symbol>;
}

/// Why the last lookup came back empty, for error messages.
#[derive(Debug, Default)]
pub(super) struct Misses {
    /// Defined in a file that is not imported: (file name, symbol name).
    undeclared: Option<(String, String)>,
    /// A compound name whose first part bound to an inner scope.
    unresolved: Option<String>,
}

impl Misses {
    pub(super) fn unresolved(&self) -> Option<&str> {
        self.unresolved.as_deref()
    }

    pub(super) fn not_defined_messages(&self, undefined: &str, filename: &str) -> Vec<String> {
        if self.undeclared.is_none() && self.unresolved.is_none() {
            return vec![format!("\"{undefined}\" is not defined.")];
        }
        let mut messages = Vec::new();
        if let Some((file, symbol)) = &self.undeclared {
            messages.push(format!(
                "\"{symbol}\" seems to be defined in \"{file}\", which is not imported by \"{filename}\".  \
                 To use it here, please add the necessary import."
            ));
        }
        if let Some(resolved) = &self.unresolved {
            messages.push(format!(
                "\"{undefined}\" is resolved to \"{resolved}\", which is not defined. The innermost scope \
                 is searched first in name resolution. Consider using a leading '.'(i.e., \".{undefined}\") \
                 to start from the outermost scope."
            ));
        }
        messages
    }
}

fn is_in_package(package: &str, name: &str) -> bool {
    package.starts_with(name)
        && (package.len() == name.len() || package.as_bytes()[name.len()] == b'.')
}

/// Finds `name` exactly, refusing symbols from files that are not visible.
pub(super) fn find_symbol<T: SymbolTable + ?Sized>(table: &mut T, name: &str, misses: &mut Misses) -> Option<Symbol> {
    let symbol = table.find_not_enforcing_deps(name)?;
    let data = table.data();
    let vis = table.visibility();
    let file = data.symbol_file(symbol);
    if file == vis.file || vis.dependencies.contains(&file) {
        return Some(symbol);
    }
    if let Symbol::Package(_) = symbol {
        // Packages span files; any visible file in the package will do.
        if is_in_package(&data.file(vis.file).package, name)
            || vis
                .dependencies
                .iter()
                .any(|&dep| is_in_package(&data.file(dep).package, name))
        {
            return Some(symbol);
        }
    }
    misses.undeclared = Some((data.file(file).name.clone(), name.to_owned()));
    None
}

/// Resolves `name` as written inside the element `relative_to`, searching
/// from the innermost enclosing scope outward. A leading dot makes the name
/// fully qualified.
///
/// For a compound name only the first component is searched for; once it
/// binds, the rest must be found inside it.
pub(super) fn lookup_symbol_no_placeholder<T: SymbolTable + ?Sized>(
    table: &mut T,
    name: &str,
    relative_to: &str,
    mode: LookupMode,
    misses: &mut Misses,
) -> Option<Symbol> {
    *misses = Misses::default();
    if let Some(full) = name.strip_prefix('.') {
        return find_symbol(table, full, misses);
    }
    let first_part = name.split('.').next().unwrap_or(name);
    let mut scope = relative_to.to_owned();
    loop {
        let Some(dot) = scope.rfind('.') else {
            return find_symbol(table, name, misses);
        };
        scope.truncate(dot);
        let old_len = scope.len();
        scope.push('.');
        scope.push_str(first_part);
        if let Some(found) = find_symbol(table, &scope, misses) {
            if first_part.len() < name.len() {
                if found.is_aggregate() {
                    scope.push_str(&name[first_part.len()..]);
                    let result = find_symbol(table, &scope, misses);
                    if result.is_none() {
                        misses.unresolved = Some(scope);
                    }
                    return result;
                }
            } else if mode == LookupMode::All || found.is_type() {
                return Some(found);
            }
        }
        scope.truncate(old_len);
    }
}

/// Dot-separated identifiers, optionally with a leading dot.
pub(super) fn is_qualified_name(name: &str) -> bool {
    let mut last_was_period = false;
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            last_was_period = false;
        } else if b == b'.' {
            if last_was_period {
                return false;
            }
            last_was_period = true;
        } else {
            return false;
        }
    }
    !name.is_empty() && !last_was_period
}

/// A symbol table over the pool as it stands that never loads anything.
pub(super) struct SnapshotTable<'a> {
    pub(super) data: &'a PoolData,
    pub(super) visibility: &'a Visibility,
}

impl SymbolTable for SnapshotTable<'_> {
    fn data(&self) -> &PoolData {
        self.data
    }

    fn visibility(&self) -> &Visibility {
        self.visibility
    }

    fn find_not_enforcing_deps(&mut self, name: &str) -> Option<Symbol> {
        self.data.find_symbol(name)
    }
}
