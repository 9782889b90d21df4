// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tracks each file's exported names and resolves wildcard/explicit
//! re-exports across files (§4.4).
//!
//! The registry is the one piece of shared mutable state in the
//! pipeline (§5): many concurrent `lookup`/`public_symbols` readers,
//! one exclusive writer per `register` call, guarded by a single
//! `RwLock` rather than per-entry locking — a call sees a consistent
//! snapshot, never a half-written module's symbols.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::span::{NodeId, Span};

/// What a [`Symbol`] names. `def`/`class`/`view` heads and top-level
/// assignments all produce one of these; the binding-classification
/// taxonomy from the resolver (§4.3) is a different axis and not
/// reused here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    View,
    Function,
    Class,
    Variable,
}

/// One exported (or private, but locally tracked) name in a module.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub node_id: NodeId,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, node_id: NodeId, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            node_id,
            span,
        }
    }

    /// §4.4 visibility rule: a name is public unless it begins with `_`.
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

/// One file's complete symbol table, in declaration order (so
/// `public_symbols` and re-export expansion report names in a
/// deterministic, first-appearance order).
#[derive(Debug, Clone, Default)]
pub struct ModuleSymbols {
    order: Vec<String>,
    symbols: HashMap<String, Symbol>,
}

impl ModuleSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a symbol. A later top-level binding of the
    /// same name shadows an earlier one, matching the resolver's own
    /// "last write wins" declaration semantics.
    pub fn insert(&mut self, symbol: Symbol) {
        if !self.symbols.contains_key(&symbol.name) {
            self.order.push(symbol.name.clone());
        }
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(|name| self.symbols.get(name))
    }

    pub fn public(&self) -> impl Iterator<Item = &Symbol> {
        self.all().filter(|s| s.is_public())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Counts returned by [`SymbolRegistry::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub modules: usize,
    pub symbols: usize,
    pub public_symbols: usize,
}

/// A re-export request: `from <source> import <imported> [as <alias>]`
/// at module top level.
#[derive(Debug, Clone)]
pub struct ReExport {
    pub source: PathBuf,
    pub imported: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SymbolError {
    #[error("cannot re-export `{name}` from {source}: it is not registered yet")]
    SourceNotRegistered { source: PathBuf, name: String },

    #[error("cannot re-export `{name}` from {source}: no such public symbol")]
    NoSuchPublicSymbol { source: PathBuf, name: String },
}

/// Process-scoped, owned registry instance (§9 re-architecture point:
/// no global mutable singleton — the coordinator constructs one and
/// lends it to workers).
#[derive(Default)]
pub struct SymbolRegistry {
    modules: RwLock<HashMap<PathBuf, ModuleSymbols>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: PathBuf, symbols: ModuleSymbols) {
        self.modules.write().unwrap().insert(path, symbols);
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.modules.read().unwrap().contains_key(path)
    }

    pub fn lookup(&self, path: &Path, name: &str) -> Option<Symbol> {
        self.modules
            .read()
            .unwrap()
            .get(path)
            .and_then(|m| m.get(name))
            .cloned()
    }

    pub fn public_symbols(&self, path: &Path) -> Vec<Symbol> {
        self.modules
            .read()
            .unwrap()
            .get(path)
            .map(|m| m.public().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RegistryStats {
        let modules = self.modules.read().unwrap();
        let symbols: usize = modules.values().map(ModuleSymbols::len).sum();
        let public_symbols: usize = modules.values().map(|m| m.public().count()).sum();
        RegistryStats {
            modules: modules.len(),
            symbols,
            public_symbols,
        }
    }

    /// Expands `from <from> import *`: all of `from`'s public symbols,
    /// in first-appearance order. Empty if `from` is not registered —
    /// the dependency graph guarantees it is by the time any importer
    /// reaches this call.
    pub fn expand_wildcard(&self, from: &Path) -> Vec<Symbol> {
        self.public_symbols(from)
    }

    /// Applies one explicit re-export (`from X import A, B as C`) onto
    /// `dependent`'s own symbol table. `dependent` must already be
    /// registered. Fails if `source` is not yet registered or does not
    /// export `imported` publicly — the topological compile order is
    /// expected to make both conditions unreachable in practice (§4.4),
    /// so a caller hitting this error has a dependency-graph bug.
    pub fn apply_reexport(&self, dependent: &Path, reexport: &ReExport) -> Result<(), SymbolError> {
        let mut modules = self.modules.write().unwrap();
        let source_symbol = modules
            .get(&reexport.source)
            .ok_or_else(|| SymbolError::SourceNotRegistered {
                source: reexport.source.clone(),
                name: reexport.imported.clone(),
            })?
            .get(&reexport.imported)
            .filter(|s| s.is_public())
            .cloned()
            .ok_or_else(|| SymbolError::NoSuchPublicSymbol {
                source: reexport.source.clone(),
                name: reexport.imported.clone(),
            })?;

        let bound_name = reexport.alias.clone().unwrap_or_else(|| reexport.imported.clone());
        let exported = Symbol {
            name: bound_name,
            ..source_symbol
        };
        modules
            .entry(dependent.to_path_buf())
            .or_default()
            .insert(exported);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Position, Span};

    fn span() -> Span {
        Span::new(Position::new(1, 0, 0), Position::new(1, 5, 5))
    }

    #[test]
    fn visibility_follows_leading_underscore() {
        let public = Symbol::new("greet", SymbolKind::Function, NodeId::new(0), span());
        let private = Symbol::new("_helper", SymbolKind::Function, NodeId::new(1), span());
        assert!(public.is_public());
        assert!(!private.is_public());
    }

    #[test]
    fn public_symbols_excludes_private_names() {
        let mut symbols = ModuleSymbols::new();
        symbols.insert(Symbol::new("greet", SymbolKind::Function, NodeId::new(0), span()));
        symbols.insert(Symbol::new("_helper", SymbolKind::Function, NodeId::new(1), span()));
        let public: Vec<_> = symbols.public().map(|s| s.name.as_str()).collect();
        assert_eq!(public, vec!["greet"]);
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = SymbolRegistry::new();
        let mut symbols = ModuleSymbols::new();
        symbols.insert(Symbol::new("Greeting", SymbolKind::View, NodeId::new(0), span()));
        let path = PathBuf::from("/project/greeting.psx");
        registry.register(path.clone(), symbols);

        assert!(registry.is_registered(&path));
        assert_eq!(registry.lookup(&path, "Greeting").unwrap().kind, SymbolKind::View);
        assert_eq!(registry.lookup(&path, "missing"), None);
        assert_eq!(registry.public_symbols(&path).len(), 1);
    }

    #[test]
    fn reexport_fails_when_source_not_registered() {
        let registry = SymbolRegistry::new();
        let dependent = PathBuf::from("/project/main.psx");
        registry.register(dependent.clone(), ModuleSymbols::new());
        let reexport = ReExport {
            source: PathBuf::from("/project/utils.psx"),
            imported: "helper".to_string(),
            alias: None,
        };
        assert!(matches!(
            registry.apply_reexport(&dependent, &reexport),
            Err(SymbolError::SourceNotRegistered { .. })
        ));
    }

    #[test]
    fn reexport_adds_aliased_public_symbol_to_dependent() {
        let registry = SymbolRegistry::new();
        let source = PathBuf::from("/project/utils.psx");
        let dependent = PathBuf::from("/project/main.psx");

        let mut source_symbols = ModuleSymbols::new();
        source_symbols.insert(Symbol::new("helper", SymbolKind::Function, NodeId::new(0), span()));
        registry.register(source.clone(), source_symbols);
        registry.register(dependent.clone(), ModuleSymbols::new());

        let reexport = ReExport {
            source,
            imported: "helper".to_string(),
            alias: Some("helper_fn".to_string()),
        };
        registry.apply_reexport(&dependent, &reexport).unwrap();
        assert_eq!(registry.lookup(&dependent, "helper_fn").unwrap().name, "helper_fn");
    }

    #[test]
    fn stats_counts_modules_and_symbols() {
        let registry = SymbolRegistry::new();
        let mut symbols = ModuleSymbols::new();
        symbols.insert(Symbol::new("a", SymbolKind::Variable, NodeId::new(0), span()));
        symbols.insert(Symbol::new("_b", SymbolKind::Variable, NodeId::new(1), span()));
        registry.register(PathBuf::from("/p/m.psx"), symbols);

        let stats = registry.stats();
        assert_eq!(stats.modules, 1);
        assert_eq!(stats.symbols, 2);
        assert_eq!(stats.public_symbols, 1);
    }
}
