use crate::tokenizer::Span;
use std::fmt;
use std::io;

/// Kind of structural compile error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnclosedComponent,
    MismatchedCloseTag,
    UnexpectedCloseTag,
    InvalidAttributeValue,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnclosedComponent => "Unclosed component",
            ErrorKind::MismatchedCloseTag => "Mismatched close tag",
            ErrorKind::UnexpectedCloseTag => "Unexpected close tag",
            ErrorKind::InvalidAttributeValue => "Invalid attribute value",
        }
    }
}

/// Structural error in the source being compiled
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub related_span: Option<Span>,
    pub related_label: Option<String>,
    pub help: Option<String>,
}

impl SyntaxError {
    /// Create a new syntax error
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            related_span: None,
            related_label: None,
            help: None,
        }
    }

    /// Add a related span (e.g. where the unclosed tag was opened)
    pub fn with_related(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }

    /// Set the label for the related span
    pub fn with_related_label(mut self, label: impl Into<String>) -> Self {
        self.related_label = Some(label.into());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let underline = if color { "\x1b[4m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();

        // Leading blank line for visual separation
        output.push('\n');

        // File location at the top: prefer the related span (where the fix
        // usually goes) when one is attached.
        let loc_span = self.related_span.as_ref().unwrap_or(&self.span);
        let (loc_line, loc_col) = line_col(source, loc_span.start);
        let location = format!("{}:{}:{}", filename, loc_line + 1, loc_col + 1);
        if color {
            // OSC 8 hyperlink: \x1b]8;;URL\x07TEXT\x1b]8;;\x07
            let abs_path = std::path::Path::new(filename)
                .canonicalize()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| filename.to_string());
            output.push_str(&format!(
                " {}file:{} \x1b]8;;file://{}\x07{}{}{}\x1b]8;;\x07\n",
                dim, reset, abs_path, underline, location, reset
            ));
        } else {
            output.push_str(&format!(" file: {}\n", location));
        }

        // Error header
        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        // Source context with a caret underline
        let (err_line, err_col) = line_col(source, self.span.start);
        if let Some(source_line) = source.lines().nth(err_line) {
            let line_num = err_line + 1;
            let line_num_width = format!("{}", line_num).len().max(2);
            output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = line_num_width));
            output.push_str(&format!("{}{:>width$} |{} {}\n", dim, line_num, reset, source_line, width = line_num_width));

            let carets = "^".repeat(underline_len(source, source_line, self.span, err_line, err_col));
            let spaces = " ".repeat(err_col);
            output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim, "", reset,
                spaces, red, carets, reset,
                width = line_num_width
            ));
        }

        // Related span: secondary context, dim carets
        if let Some(ref related) = self.related_span {
            let (related_line, related_col) = line_col(source, related.start);
            if let Some(related_source_line) = source.lines().nth(related_line) {
                let line_num = related_line + 1;
                let line_num_width = format!("{}", line_num).len().max(2);
                output.push_str(&format!(
                    "{}{:>width$} |{} {}\n",
                    dim, line_num, reset,
                    related_source_line,
                    width = line_num_width
                ));

                let carets = "^".repeat(underline_len(source, related_source_line, *related, related_line, related_col));
                let spaces = " ".repeat(related_col);
                let label = self.related_label.as_deref().unwrap_or("opened here");
                output.push_str(&format!(
                    "{}{:>width$} |{} {}{}{} {}{}\n",
                    dim, "", reset,
                    spaces, dim, carets, label, reset,
                    width = line_num_width
                ));
            }
        }

        if let Some(ref help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        // Trailing blank line for visual separation
        output.push('\n');

        output
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// 0-indexed (line, column) of a byte offset; columns count characters.
fn line_col(source: &str, byte: usize) -> (usize, usize) {
    let at = byte.min(source.len());
    let prefix = &source[..at];
    let line = prefix.bytes().filter(|&b| b == b'\n').count();
    let line_start = prefix.rfind('\n').map_or(0, |p| p + 1);
    let col = prefix[line_start..].chars().count();
    (line, col)
}

/// Caret count for a span on its starting line, at least one.
fn underline_len(source: &str, source_line: &str, span: Span, start_line: usize, start_col: usize) -> usize {
    let (end_line, end_col) = line_col(source, span.end);
    if end_line == start_line {
        (end_col.saturating_sub(start_col)).max(1)
    } else {
        source_line.chars().count().saturating_sub(start_col).max(1)
    }
}

/// Error from one compile pass: a structural problem in the source, or a
/// failed write to the output sink.
#[derive(Debug)]
pub enum CompileError {
    Syntax(SyntaxError),
    Io(io::Error),
}

impl CompileError {
    /// Render the error with source context (no color)
    pub fn render(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Syntax(err) => err.render(source, filename),
            CompileError::Io(err) => format!("error: {}\n", err),
        }
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Syntax(err) => err.render_color(source, filename),
            CompileError::Io(err) => format!("\x1b[1;31merror\x1b[0m: \x1b[1m{}\x1b[0m\n", err),
        }
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        CompileError::Syntax(err)
    }
}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> Self {
        CompileError::Io(err)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Syntax(err) => write!(f, "{}", err),
            CompileError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {}
