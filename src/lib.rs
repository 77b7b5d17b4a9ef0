use std::io;

pub mod buffers;
pub mod compiler;
pub mod component;
pub mod directive;
pub mod entities;
pub mod error;
pub mod tokenizer;
pub mod values;

pub use compiler::{CompileSummary, Compiler};
pub use error::{CompileError, ErrorKind, SyntaxError};
pub use tokenizer::{Attr, Span, Token, Tokenizer};

/// Configuration for a compile pass.
#[derive(Debug, Clone)]
pub struct Options {
    /// Tag prefix that marks an element as a component (default: "x-")
    pub component_prefix: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            component_prefix: "x-".to_string(),
        }
    }
}

/// Compile `source`, writing the rewritten template to `sink`.
pub fn compile<W: io::Write>(source: &str, sink: &mut W) -> Result<CompileSummary, CompileError> {
    Compiler::new(source).compile(sink)
}

/// Compile `source` with explicit options.
pub fn compile_with<W: io::Write>(
    source: &str,
    options: &Options,
    sink: &mut W,
) -> Result<CompileSummary, CompileError> {
    Compiler::with_options(source, options).compile(sink)
}

/// Compile `source` into an owned string.
///
/// ```
/// let output = xtempl::compile_to_string("<x-badge label=\"New\"/>").unwrap();
/// assert_eq!(output, "{{ template \"badge\" dict \"label\" \"New\" }}");
/// ```
pub fn compile_to_string(source: &str) -> Result<String, CompileError> {
    let mut out = Vec::new();
    compile(source, &mut out)?;
    Ok(String::from_utf8(out).expect("compiled output is valid UTF-8"))
}
