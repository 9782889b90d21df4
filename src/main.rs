// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Binary entry point for the `psxc` CLI (§6 External Interfaces, §11
//! Supplemental Features).

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use psxc::config::Config;
use psxc::core::ast::Module;
use psxc::core::depgraph::ModulePathResolver;
use psxc::core::diagnostics::Diagnostics;
use psxc::core::project::{compile_project, ProjectResult};
use psxc::core::resolver::{self, ResolutionTable};
use psxc::core::{emit, lexer};
use psxc::error::PsxError;
use psxc::fs::{FileSystem, RealFileSystem};
use psxc::printer;
use psxc::render::render_diagnostic;
use psxc::watch::{self, Watcher};

// ============================================================================
// CLI Structure
// ============================================================================

/// Compiles the PSX view-template language to plain Python.
#[derive(Parser)]
#[command(name = "psxc", version, about = "Compiles PSX view templates to Python")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Path to a `psxc.toml` config file (default: `./psxc.toml` if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit structured JSON logs instead of the default human-readable format.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum EmitKind {
    Tokens,
    Ast,
    Resolution,
    TransformedAst,
    All,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum ResolutionFormat {
    Text,
    Json,
    All,
    None,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Stage {
    Summary,
    Tokens,
    Ast,
    Resolution,
    Transform,
    Codegen,
}

#[derive(Subcommand)]
enum Command {
    /// Compiles one file or a directory of `.psx` files to Python.
    Compile {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        emit: Option<EmitKind>,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        debug: bool,
    },
    /// Recompiles a directory on every `.psx` change.
    Watch {
        directory: PathBuf,
        #[arg(long, default_value_t = 200)]
        debounce_ms: u64,
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Tokenizes one file and writes its `.tok` dump.
    Scan { input: PathBuf, output: Option<PathBuf> },
    /// Parses one file and writes its `.ast` dump.
    Parse {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "none")]
        resolution: ResolutionFormat,
    },
    /// Prints one pipeline stage's output for a single file.
    Inspect {
        input: PathBuf,
        #[arg(long, value_enum, default_value = "summary")]
        stage: Stage,
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn execute(cli: Cli) -> Result<(), PsxError> {
    let config = Config::load(cli.global.config.as_deref()).map_err(PsxError::Config)?;

    match cli.command {
        Command::Compile { input, output, emit, recursive, debug } => {
            execute_compile(&config, &input, output.as_deref(), emit, recursive || config.recursive, debug)
        }
        Command::Watch { directory, debounce_ms, clear, output } => execute_watch(&config, &directory, debounce_ms, clear, output.as_deref()),
        Command::Scan { input, output } => execute_scan(&input, output.as_deref()),
        Command::Parse { input, output, resolution } => execute_parse(&input, output.as_deref(), resolution),
        Command::Inspect { input, stage, json } => execute_inspect(&input, stage, json),
    }
}

// ============================================================================
// A flat, directory-relative import resolver
// ============================================================================

/// Resolves `import a.b`/`from .a import b` to a sibling `.psx` file,
/// treating dotted segments as path components and each leading
/// relative-import dot beyond the first as one directory level up.
/// There is no package search path — every project is a flat tree of
/// directories rooted at the compiled input, the simplest resolution
/// rule the CLI's single-root, no-build-manifest model supports.
struct DirectoryModuleResolver;

impl ModulePathResolver for DirectoryModuleResolver {
    fn resolve(&self, importer: &Path, dots: u32, module: Option<&str>) -> Option<PathBuf> {
        let mut dir = importer.parent()?.to_path_buf();
        for _ in 0..dots.saturating_sub(1) {
            dir = dir.parent()?.to_path_buf();
        }
        let name = module?;
        let relative: PathBuf = name.split('.').collect();
        Some(dir.join(relative).with_extension("psx"))
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn read_sources(fsys: &dyn FileSystem, input: &Path, recursive: bool) -> Result<Vec<(PathBuf, String)>, PsxError> {
    use rayon::prelude::*;

    if !fsys.exists(input) {
        return Err(PsxError::io(input, std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory")));
    }
    let paths = if fsys.is_dir(input) {
        fsys.list_dir(input, recursive).map_err(|e| PsxError::io(input, e))?
    } else {
        vec![input.to_path_buf()]
    };
    // Reading is the one part of source discovery that's embarrassingly
    // parallel across files, same as the coordinator's own lex/parse
    // phase one level down (`psxc_core::project`).
    paths
        .into_par_iter()
        .map(|path| {
            let contents = fsys.read_to_string(&path).map_err(|e| PsxError::io(&path, e))?;
            Ok((path, contents))
        })
        .collect()
}

fn report_diagnostics(result: &ProjectResult, sources: &std::collections::HashMap<PathBuf, String>) {
    if let Some(cycle) = &result.cycle_error {
        eprintln!("{cycle}");
    }
    for (path, file) in &result.files {
        let empty = String::new();
        let source = sources.get(path).unwrap_or(&empty);
        for diag in file.diagnostics.iter() {
            eprintln!("{}", render_diagnostic(source, diag));
        }
    }
}

fn write_output(output: Option<&Path>, input: &Path, extension: &str, contents: &str) -> Result<(), PsxError> {
    let target = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension(extension));
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PsxError::io(parent, e))?;
    }
    std::fs::write(&target, contents).map_err(|e| PsxError::io(&target, e))
}

// ============================================================================
// compile
// ============================================================================

fn execute_compile(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    emit_kind: Option<EmitKind>,
    recursive: bool,
    debug: bool,
) -> Result<(), PsxError> {
    let fsys = RealFileSystem::new(config.exclude.clone());
    let sources = read_sources(&fsys, input, recursive)?;
    let source_map: std::collections::HashMap<PathBuf, String> = sources.iter().cloned().collect();

    let result = compile_project(&sources, &DirectoryModuleResolver);

    if result.has_errors() {
        report_diagnostics(&result, &source_map);
        return Err(PsxError::CompileFailed);
    }

    for path in &result.order {
        let file = &result.files[path];
        let source = &source_map[path];

        if let Some(kind) = emit_kind {
            emit_artifacts(path, file, source, kind)?;
        }

        if let Some(transformed) = &file.transformed {
            let python = printer::print_module(transformed);
            let out_path = output.map(|o| {
                if fsys.is_dir(input) {
                    o.join(path.strip_prefix(input).unwrap_or(path)).with_extension("py")
                } else {
                    o.to_path_buf()
                }
            });
            write_output(out_path.as_deref(), path, "py", &python)?;
            if debug {
                eprintln!("compiled {}", path.display());
            }
        }
    }

    Ok(())
}

fn emit_artifacts(path: &Path, file: &psxc::core::project::CompiledFile, source: &str, kind: EmitKind) -> Result<(), PsxError> {
    let module = file.module.as_ref();
    let wants = |k: EmitKind| kind == k || kind == EmitKind::All;

    if wants(EmitKind::Tokens) {
        let scan = lexer::scan(source);
        write_output(None, path, "tok", &emit::render_tokens(&scan.tokens, &scan.errors))?;
    }
    if wants(EmitKind::Ast) {
        if let Some(module) = module {
            write_output(None, path, "ast", &emit::render_ast(module))?;
        }
    }
    if wants(EmitKind::Resolution) {
        if let (Some(module), Some(table)) = (module, file.resolution.as_ref()) {
            write_output(None, path, "res", &emit::render_resolution_text(module, table))?;
        }
    }
    if wants(EmitKind::TransformedAst) {
        if let Some(transformed) = &file.transformed {
            write_output(None, path, "tast", &emit::render_ast(transformed))?;
        }
    }
    Ok(())
}

// ============================================================================
// watch
// ============================================================================

fn execute_watch(config: &Config, directory: &Path, debounce_ms: u64, clear: bool, output: Option<&Path>) -> Result<(), PsxError> {
    let fsys = RealFileSystem::new(config.exclude.clone());

    let initial = watch::initial_files(directory);
    recompile_and_report(&initial, &fsys, directory, output);

    let watcher = Watcher::new(directory, debounce_ms).map_err(|e| PsxError::Config(e.to_string()))?;
    while let Some(batch) = watcher.next_batch() {
        if batch.is_empty() {
            continue;
        }
        if clear {
            print!("\x1B[2J\x1B[1;1H");
            let _ = io::stdout().flush();
        }
        recompile_and_report(&batch, &fsys, directory, output);
    }
    Ok(())
}

fn recompile_and_report(paths: &[PathBuf], fsys: &dyn FileSystem, root: &Path, output: Option<&Path>) {
    let sources: Vec<(PathBuf, String)> = paths
        .iter()
        .filter_map(|path| fsys.read_to_string(path).ok().map(|contents| (path.clone(), contents)))
        .collect();
    if sources.is_empty() {
        return;
    }
    let source_map: std::collections::HashMap<PathBuf, String> = sources.iter().cloned().collect();
    let result = compile_project(&sources, &DirectoryModuleResolver);
    report_diagnostics(&result, &source_map);

    for path in &result.order {
        if let Some(transformed) = &result.files[path].transformed {
            let python = printer::print_module(transformed);
            let out_path = output.map(|o| o.join(path.strip_prefix(root).unwrap_or(path)).with_extension("py"));
            let _ = write_output(out_path.as_deref(), path, "py", &python);
        }
    }
}

// ============================================================================
// scan
// ============================================================================

fn execute_scan(input: &Path, output: Option<&Path>) -> Result<(), PsxError> {
    let source = std::fs::read_to_string(input).map_err(|e| PsxError::io(input, e))?;
    let scan = lexer::scan(&source);
    let text = emit::render_tokens(&scan.tokens, &scan.errors);
    match output {
        Some(path) => std::fs::write(path, text).map_err(|e| PsxError::io(path, e))?,
        None => print!("{text}"),
    }
    if scan.errors.is_empty() {
        Ok(())
    } else {
        Err(PsxError::CompileFailed)
    }
}

// ============================================================================
// parse
// ============================================================================

fn execute_parse(input: &Path, output: Option<&Path>, resolution: ResolutionFormat) -> Result<(), PsxError> {
    let source = std::fs::read_to_string(input).map_err(|e| PsxError::io(input, e))?;
    let scan = lexer::scan(&source);
    let (module, errors) = psxc::core::parser::parse(&scan.tokens);

    let ast_text = emit::render_ast(&module);
    match output {
        Some(path) => std::fs::write(path, &ast_text).map_err(|e| PsxError::io(path, e))?,
        None => print!("{ast_text}"),
    }

    if resolution != ResolutionFormat::None {
        let table = resolver::resolve(&module);
        write_resolution(input, &module, &table, resolution)?;
    }

    let mut diagnostics = Diagnostics::new();
    for err in &scan.errors {
        diagnostics.push(psxc::core::diagnostics::Diagnostic::error(input, err.span(), err.code(), err.to_string()));
    }
    for err in &errors {
        diagnostics.push(psxc::core::diagnostics::Diagnostic::error(input, err.span(), err.code(), err.to_string()));
    }
    for diag in diagnostics.iter() {
        eprintln!("{}", render_diagnostic(&source, diag));
    }

    if diagnostics.has_errors() {
        Err(PsxError::CompileFailed)
    } else {
        Ok(())
    }
}

fn write_resolution(input: &Path, module: &Module, table: &ResolutionTable, format: ResolutionFormat) -> Result<(), PsxError> {
    if matches!(format, ResolutionFormat::Text | ResolutionFormat::All) {
        write_output(None, input, "res", &emit::render_resolution_text(module, table))?;
    }
    if matches!(format, ResolutionFormat::Json | ResolutionFormat::All) {
        write_output(None, input, "res.json", &emit::render_resolution_json(input, module, table))?;
    }
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

fn execute_inspect(input: &Path, stage: Stage, json: bool) -> Result<(), PsxError> {
    let source = std::fs::read_to_string(input).map_err(|e| PsxError::io(input, e))?;
    let scan = lexer::scan(&source);
    let (module, parse_errors) = psxc::core::parser::parse(&scan.tokens);

    let text = match stage {
        Stage::Summary => format!(
            "{}: {} tokens, {} statements, {} scan errors, {} parse errors",
            input.display(),
            scan.tokens.len(),
            module.body.len(),
            scan.errors.len(),
            parse_errors.len()
        ),
        Stage::Tokens => emit::render_tokens(&scan.tokens, &scan.errors),
        Stage::Ast => emit::render_ast(&module),
        Stage::Resolution => {
            let table = resolver::resolve(&module);
            if json {
                emit::render_resolution_json(input, &module, &table)
            } else {
                emit::render_resolution_text(&module, &table)
            }
        }
        Stage::Transform => {
            let table = resolver::resolve(&module);
            match psxc::core::transform::transform(&module, &table) {
                Ok(transformed) => emit::render_ast(&transformed),
                Err(err) => format!("transform error: {err}"),
            }
        }
        Stage::Codegen => {
            let table = resolver::resolve(&module);
            match psxc::core::transform::transform(&module, &table) {
                Ok(transformed) => printer::print_module(&transformed),
                Err(err) => format!("transform error: {err}"),
            }
        }
    };

    if json && !matches!(stage, Stage::Resolution) {
        println!("{}", serde_json::json!({ "stage": format!("{stage:?}"), "output": text }));
    } else {
        println!("{text}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn compile_requires_an_input_path() {
            let result = Cli::try_parse_from(["psxc", "compile"]);
            assert!(result.is_err());
        }

        #[test]
        fn compile_accepts_emit_and_recursive_flags() {
            let cli = Cli::try_parse_from(["psxc", "compile", "src", "--emit", "all", "--recursive"]).unwrap();
            match cli.command {
                Command::Compile { input, recursive, emit, .. } => {
                    assert_eq!(input, PathBuf::from("src"));
                    assert!(recursive);
                    assert_eq!(emit, Some(EmitKind::All));
                }
                _ => panic!("expected Compile"),
            }
        }

        #[test]
        fn watch_parses_debounce_and_clear() {
            let cli = Cli::try_parse_from(["psxc", "watch", "proj", "--debounce-ms", "500", "--clear"]).unwrap();
            match cli.command {
                Command::Watch { directory, debounce_ms, clear, .. } => {
                    assert_eq!(directory, PathBuf::from("proj"));
                    assert_eq!(debounce_ms, 500);
                    assert!(clear);
                }
                _ => panic!("expected Watch"),
            }
        }

        #[test]
        fn global_log_level_defaults_to_warn() {
            let cli = Cli::try_parse_from(["psxc", "scan", "a.psx"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
        }

        #[test]
        fn inspect_parses_stage_and_json() {
            let cli = Cli::try_parse_from(["psxc", "inspect", "a.psx", "--stage", "resolution", "--json"]).unwrap();
            match cli.command {
                Command::Inspect { stage, json, .. } => {
                    assert!(matches!(stage, Stage::Resolution));
                    assert!(json);
                }
                _ => panic!("expected Inspect"),
            }
        }
    }

    mod log_level {
        use super::*;

        #[test]
        fn maps_every_variant_to_a_tracing_level() {
            assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
            assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
            assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
            assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
            assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        }
    }

    mod exit_codes {
        use super::*;

        #[test]
        fn usage_error_maps_to_two() {
            assert_eq!(PsxError::usage("bad flag").exit_code(), 2);
        }

        #[test]
        fn compile_failed_maps_to_one() {
            assert_eq!(PsxError::CompileFailed.exit_code(), 1);
        }
    }

    #[test]
    fn directory_resolver_resolves_a_sibling_module() {
        let resolver = DirectoryModuleResolver;
        let resolved = resolver.resolve(Path::new("/p/main.psx"), 0, Some("utils")).unwrap();
        assert_eq!(resolved, PathBuf::from("/p/utils.psx"));
    }

    #[test]
    fn directory_resolver_walks_up_for_extra_relative_dots() {
        let resolver = DirectoryModuleResolver;
        let resolved = resolver.resolve(Path::new("/p/sub/main.psx"), 2, Some("utils")).unwrap();
        assert_eq!(resolved, PathBuf::from("/p/utils.psx"));
    }
}
