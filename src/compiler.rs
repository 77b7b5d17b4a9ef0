//! The stream transducer: tokens in, compiled template out.
//!
//! Non-component tokens are re-emitted from their raw slices untouched.
//! Component tags become block invocations, and everything between a
//! component's start and end tag accumulates in a child buffer that is
//! appended after the main output as a named block definition.

use crate::buffers::ChildBuffers;
use crate::component;
use crate::directive::{self, AttributeError};
use crate::error::{CompileError, ErrorKind, SyntaxError};
use crate::tokenizer::{Attr, Span, Token, Tokenizer};
use crate::Options;
use log::debug;
use serde::Serialize;
use std::io;

/// Totals from one compile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    /// Component tags rewritten (start and self-closing).
    pub components: usize,
    /// Child block definitions emitted.
    pub child_blocks: usize,
}

/// One compile pass over one source string.
///
/// Owns all per-pass state: the tokenizer cursor, the occurrence counters,
/// and the open child buffers. `compile` consumes the instance, so a pass
/// cannot be rerun; build a fresh compiler to compile again.
pub struct Compiler<'s> {
    tokenizer: Tokenizer<'s>,
    prefix: String,
    buffers: ChildBuffers,
    summary: CompileSummary,
}

impl<'s> Compiler<'s> {
    pub fn new(source: &'s str) -> Self {
        Self::with_options(source, &Options::default())
    }

    pub fn with_options(source: &'s str, options: &Options) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            prefix: options.component_prefix.clone(),
            buffers: ChildBuffers::new(),
            summary: CompileSummary::default(),
        }
    }

    /// Run the pass to completion, writing compiled output to `sink`.
    ///
    /// On any error the pass stops immediately; the caller should discard
    /// whatever partial output reached the sink.
    pub fn compile<W: io::Write>(mut self, sink: &mut W) -> Result<CompileSummary, CompileError> {
        loop {
            match self.tokenizer.next_token() {
                Token::Eof { span } => {
                    self.finish(span, sink)?;
                    return Ok(self.summary);
                }
                Token::StartTag { name, attrs, self_closing, raw, span } => {
                    if component::is_component(name, &self.prefix) {
                        self.component_tag(name, &attrs, self_closing, span, sink)?;
                    } else {
                        self.emit(raw, sink)?;
                    }
                }
                Token::EndTag { name, raw, span } => {
                    if component::is_component(name, &self.prefix) {
                        self.close_component(name, span)?;
                    } else {
                        self.emit(raw, sink)?;
                    }
                }
                Token::Text { raw, .. } | Token::Comment { raw, .. } | Token::Doctype { raw, .. } => {
                    self.emit(raw, sink)?;
                }
            }
        }
    }

    /// Copy `text` to the current sink: the innermost open child buffer, or
    /// the top-level output when no component scope is open.
    fn emit<W: io::Write>(&mut self, text: &str, sink: &mut W) -> io::Result<()> {
        match self.buffers.current_mut() {
            Some(body) => {
                body.push_str(text);
                Ok(())
            }
            None => sink.write_all(text.as_bytes()),
        }
    }

    /// Rewrite one component tag into its invocation; start tags also open a
    /// child scope.
    fn component_tag<W: io::Write>(
        &mut self,
        name: &str,
        attrs: &[Attr<'_>],
        self_closing: bool,
        span: Span,
        sink: &mut W,
    ) -> Result<(), CompileError> {
        let tag = name.to_ascii_lowercase();

        if self_closing {
            let call = directive::build_call(component::block_name(&tag, &self.prefix), None, attrs)
                .map_err(|err| invalid_attribute(&tag, err))?;
            self.emit(&call, sink)?;
            self.summary.components += 1;
            return Ok(());
        }

        let occurrence = self.buffers.next_occurrence(&tag);
        let child_block = component::child_block_name(&tag, occurrence);
        let call =
            directive::build_call(component::block_name(&tag, &self.prefix), Some(&child_block), attrs)
                .map_err(|err| invalid_attribute(&tag, err))?;
        self.emit(&call, sink)?;
        debug!(
            target: "xtempl.compiler",
            "open scope {child_block} at depth {}",
            self.buffers.depth() + 1
        );
        self.buffers.open(tag, &child_block, span);
        self.summary.components += 1;
        self.summary.child_blocks += 1;
        Ok(())
    }

    /// Close the innermost component scope, verifying the end tag matches.
    fn close_component(&mut self, name: &str, span: Span) -> Result<(), CompileError> {
        let Some(open) = self.buffers.innermost() else {
            return Err(SyntaxError::new(
                ErrorKind::UnexpectedCloseTag,
                format!("</{name}> has no matching opening tag"),
                span,
            )
            .into());
        };
        if !open.tag.eq_ignore_ascii_case(name) {
            return Err(SyntaxError::new(
                ErrorKind::MismatchedCloseTag,
                format!("</{name}> does not match <{}>", open.tag),
                span,
            )
            .with_related(open.open_span)
            .with_help(format!("expected </{}>", open.tag))
            .into());
        }
        debug!(
            target: "xtempl.compiler",
            "close scope {} to depth {}",
            open.tag,
            self.buffers.depth() - 1
        );
        self.buffers.close();
        Ok(())
    }

    /// End of stream: every scope must be closed, then the queued child
    /// block definitions are appended after the main output.
    fn finish<W: io::Write>(&mut self, eof: Span, sink: &mut W) -> Result<(), CompileError> {
        if let Some(open) = self.buffers.innermost() {
            return Err(SyntaxError::new(
                ErrorKind::UnclosedComponent,
                format!("<{}> is never closed", open.tag),
                eof,
            )
            .with_related(open.open_span)
            .with_help(format!("add </{}> to close the component", open.tag))
            .into());
        }
        for definition in self.buffers.finished() {
            sink.write_all(definition.as_bytes())?;
        }
        debug!(
            target: "xtempl.compiler",
            "compiled {} components into {} child blocks",
            self.summary.components,
            self.summary.child_blocks
        );
        Ok(())
    }
}

fn invalid_attribute(tag: &str, err: AttributeError) -> CompileError {
    SyntaxError::new(
        ErrorKind::InvalidAttributeValue,
        format!(
            "attribute \"{}\" on <{}> is not valid JSON: {}",
            err.attribute, tag, err.source
        ),
        err.span,
    )
    .with_help("values opening with '{' or '[' must decode as JSON")
    .into()
}
