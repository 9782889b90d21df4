//! Human-facing diagnostic rendering (§10.2): one title line plus an
//! annotated source snippet per diagnostic, built on `annotate-snippets`.

use psxc_core::diagnostics::{Diagnostic, Severity};

/// Byte offset of the start of line `n` (1-indexed).
fn bol_offset(source: &str, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    source
        .match_indices('\n')
        .nth((n - 2) as usize)
        .map(|(index, _)| index + 1)
        .unwrap_or(source.len())
}

/// Renders one diagnostic against the source text of the file it came
/// from, with one line of context on either side of its span.
pub fn render_diagnostic(source: &str, diag: &Diagnostic) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let level = match diag.severity {
        Severity::Error => Level::Error,
        Severity::Warning => Level::Warning,
    };

    let context = 1i64;
    let start_line = diag.span.start.line as i64;
    let end_line = diag.span.end.line as i64;
    let line_start = std::cmp::max(1, start_line - context) as usize;
    let start_offset = bol_offset(source, start_line - context);
    let end_offset = bol_offset(source, end_line + context + 1);
    let snippet_source = &source[start_offset..end_offset.max(start_offset)];

    let start = diag.span.start.byte_offset.saturating_sub(start_offset);
    let end = diag.span.end.byte_offset.saturating_sub(start_offset);
    let end = if start == end { (end + 1).min(snippet_source.len()) } else { end.min(snippet_source.len()) };

    let title = format!("{}: {}", diag.code, diag.message);
    let path = diag.file.display().to_string();

    Renderer::styled()
        .render(level.title(&title).snippet(
            Snippet::source(snippet_source)
                .origin(&path)
                .line_start(line_start)
                .fold(false)
                .annotations(vec![level.span(start..end).label(&diag.message)]),
        ))
        .to_string()
}
