// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Coordinates the pipeline (lex, parse, resolve, transform) across an
//! entire project of files (§5 Concurrency & Resource Model).
//!
//! Lexing and parsing are embarrassingly parallel and run across a
//! `rayon` pool. The dependency graph is then built on the calling
//! thread from the parsed imports, since `compilation_order` needs
//! every file's edges before it can answer anything. A cycle aborts
//! the whole compile right there (§7): scan/parse diagnostics already
//! collected stand, but symbol registration, resolution and transform
//! never run for any file. Otherwise resolution and transformation walk
//! the files in dependency order, since the symbol registry's re-export
//! application requires a dependency to already be registered — each
//! file still runs the same lex/parse/resolve/transform stages a
//! standalone compile would.
//!
//! Resolution and transform walk files sequentially in topological
//! order rather than in depth-batched parallel rounds — a project large
//! enough to feel this is a reasonable target for a future rayon scoped
//! pool keyed on the graph's depth levels, but the graph alone doesn't
//! expose those levels yet, so sequential is what's here today.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ast::Module;
use crate::depgraph::{extract_imports, DependencyError, DependencyGraph, ModulePathResolver};
use crate::diagnostics::Diagnostics;
use crate::lexer;
use crate::parser;
use crate::resolver::{self, ResolutionTable};
use crate::span::Spanned;
use crate::symbols::{ModuleSymbols, Symbol, SymbolKind, SymbolRegistry};
use crate::transform::{self, TransformError};

/// Everything produced for one source file across the whole pipeline.
#[derive(Debug, Default)]
pub struct CompiledFile {
    pub module: Option<Module>,
    pub resolution: Option<ResolutionTable>,
    pub transformed: Option<Module>,
    pub diagnostics: Diagnostics,
}

/// The result of compiling a whole project.
pub struct ProjectResult {
    /// Compilation order, dependencies first. Empty if a cycle made
    /// ordering impossible — see `cycle_error` in that case.
    pub order: Vec<PathBuf>,
    pub cycle_error: Option<DependencyError>,
    pub files: HashMap<PathBuf, CompiledFile>,
    pub registry: SymbolRegistry,
}

impl ProjectResult {
    pub fn has_errors(&self) -> bool {
        self.cycle_error.is_some() || self.files.values().any(|f| f.diagnostics.has_errors())
    }
}

/// Declares `path`'s top-level symbols into `registry`, classifying each
/// top-level definition by its statement kind (§4.4).
fn register_symbols(registry: &SymbolRegistry, path: &Path, module: &Module) {
    use crate::ast::Stmt;

    let mut symbols = ModuleSymbols::new();
    for stmt in &module.body {
        let (name, kind) = match stmt {
            Stmt::View(v) => (v.name.clone(), SymbolKind::View),
            Stmt::Function(f) => (f.name.clone(), SymbolKind::Function),
            Stmt::Class(c) => (c.name.clone(), SymbolKind::Class),
            Stmt::Assign(a) if a.targets.len() == 1 => match &a.targets[0] {
                crate::ast::Expr::Name(n) => (n.value.clone(), SymbolKind::Variable),
                _ => continue,
            },
            _ => continue,
        };
        let id = stmt.node_id();
        let span = stmt.span();
        symbols.insert(Symbol::new(name, kind, id, span));
    }
    registry.register(path.to_path_buf(), symbols);
}

/// Applies every `from <module> import ...` at `path`'s top level onto
/// the registry, now that every file it could depend on is registered
/// (the caller walks files in compilation order to guarantee this).
fn apply_imports(registry: &SymbolRegistry, path: &Path, module: &Module, resolver: &dyn ModulePathResolver) {
    use crate::ast::Stmt;
    use crate::symbols::ReExport;

    for stmt in &module.body {
        let Stmt::ImportFrom(i) = stmt else { continue };
        let Some(source) = resolver.resolve(path, i.dots, i.module.as_deref()) else {
            continue;
        };
        if i.wildcard {
            for symbol in registry.expand_wildcard(&source) {
                let _ = registry.apply_reexport(
                    path,
                    &ReExport {
                        source: source.clone(),
                        imported: symbol.name.clone(),
                        alias: None,
                    },
                );
            }
            continue;
        }
        for alias in &i.names {
            let _ = registry.apply_reexport(
                path,
                &ReExport {
                    source: source.clone(),
                    imported: alias.name.clone(),
                    alias: alias.alias.clone(),
                },
            );
        }
    }
}

/// Compiles every file in `sources` through the full pipeline.
/// `sources` is `(absolute path, file contents)`; `resolver` maps an
/// import statement to the absolute path it names.
pub fn compile_project(sources: &[(PathBuf, String)], resolver: &dyn ModulePathResolver) -> ProjectResult {
    let parsed: Vec<(PathBuf, Module, Diagnostics)> = sources
        .par_iter()
        .map(|(path, source)| {
            let mut diagnostics = Diagnostics::new();
            let scan = lexer::scan(source);
            for err in &scan.errors {
                diagnostics.push(crate::diagnostics::Diagnostic::error(
                    path.clone(),
                    err.span(),
                    err.code(),
                    err.to_string(),
                ));
            }
            let (module, parse_errors) = parser::parse(&scan.tokens);
            for err in &parse_errors {
                diagnostics.push(crate::diagnostics::Diagnostic::error(
                    path.clone(),
                    err.span(),
                    err.code(),
                    err.to_string(),
                ));
            }
            (path.clone(), module, diagnostics)
        })
        .collect();

    let mut graph = DependencyGraph::new();
    for (path, _, _) in &parsed {
        graph.add_file(path.clone());
    }
    for (path, module, _) in &parsed {
        for import in extract_imports(module, path, resolver) {
            let _ = graph.add_edge(path, &import.target);
        }
    }

    let (order, cycle_error) = match graph.compilation_order() {
        Ok(order) => (order, None),
        Err(err) => (Vec::new(), Some(err)),
    };

    let registry = SymbolRegistry::new();
    let mut files: HashMap<PathBuf, CompiledFile> = parsed
        .into_iter()
        .map(|(path, module, diagnostics)| {
            (
                path,
                CompiledFile {
                    module: Some(module),
                    resolution: None,
                    transformed: None,
                    diagnostics,
                },
            )
        })
        .collect();

    // §7: an import/cycle error aborts the whole project compile before
    // any per-file pipeline begins — scan/parse diagnostics already
    // collected above stand, but symbol registration, resolution and
    // transform never run.
    if cycle_error.is_none() {
        for path in &order {
            let module = files[path].module.clone().expect("parsed above");
            register_symbols(&registry, path, &module);
        }
        for path in &order {
            let module = files[path].module.clone().expect("parsed above");
            apply_imports(&registry, path, &module, resolver);
        }

        for path in &order {
            let file = files.get_mut(path).expect("present");
            let module = file.module.as_ref().expect("parsed above");
            let table = resolver::resolve(module);
            for err in table.errors() {
                file.diagnostics.push(crate::diagnostics::Diagnostic::error(
                    path.clone(),
                    err.span(),
                    err.code(),
                    err.to_string(),
                ));
            }

            match transform::transform(module, &table) {
                Ok(transformed) => file.transformed = Some(transformed),
                Err(TransformError::ResolutionHadErrors) => {}
                Err(err) => {
                    let span = err.span().unwrap_or(module.span());
                    file.diagnostics.push(crate::diagnostics::Diagnostic::error(
                        path.clone(),
                        span,
                        err.code(),
                        err.to_string(),
                    ));
                }
            }
            file.resolution = Some(table);
        }
    }

    ProjectResult {
        order,
        cycle_error,
        files,
        registry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatResolver;
    impl ModulePathResolver for FlatResolver {
        fn resolve(&self, importer: &Path, _dots: u32, module: Option<&str>) -> Option<PathBuf> {
            let dir = importer.parent()?;
            let name = module?;
            Some(dir.join(format!("{name}.psx")))
        }
    }

    #[test]
    fn compiles_independent_files_and_collects_transformed_modules() {
        let sources = vec![
            (PathBuf::from("/p/a.psx"), "view Greeting(name):\n    <p>{name}</p>\n".to_string()),
            (PathBuf::from("/p/b.psx"), "x = 1\n".to_string()),
        ];
        let result = compile_project(&sources, &FlatResolver);
        assert!(!result.has_errors());
        assert_eq!(result.order.len(), 2);
        assert!(result.files[&PathBuf::from("/p/a.psx")].transformed.is_some());
        assert_eq!(result.registry.stats().modules, 2);
    }

    #[test]
    fn reexport_is_visible_to_a_dependent_compiled_later_in_order() {
        let sources = vec![
            (PathBuf::from("/p/util.psx"), "def helper():\n    pass\n".to_string()),
            (
                PathBuf::from("/p/main.psx"),
                "from util import helper\n".to_string(),
            ),
        ];
        let result = compile_project(&sources, &FlatResolver);
        assert!(!result.has_errors());
        assert!(result.registry.lookup(Path::new("/p/main.psx"), "helper").is_some());
    }

    #[test]
    fn a_cycle_still_yields_per_file_diagnostics_for_everything_else() {
        let sources = vec![
            (PathBuf::from("/p/a.psx"), "from b import x\n".to_string()),
            (PathBuf::from("/p/b.psx"), "from a import y\n".to_string()),
        ];
        let result = compile_project(&sources, &FlatResolver);
        assert!(result.cycle_error.is_some());
        assert!(result.order.is_empty());
        assert_eq!(result.files.len(), 2);
    }
}
