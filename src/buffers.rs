//! Child-buffer bookkeeping for open component scopes.
//!
//! One buffer per open scope, innermost last; the stack index is the depth.
//! Finalized depth-1 buffers queue up for the flush at end of stream, while
//! deeper ones fold into their parent so nested definitions travel inside
//! the enclosing block's body.

use crate::tokenizer::Span;
use std::collections::HashMap;

/// An open component scope accumulating its children.
#[derive(Debug)]
pub struct ChildBuffer {
    /// Lowercased tag name that opened the scope.
    pub tag: String,
    /// Where the start tag sits in the source, for diagnostics.
    pub open_span: Span,
    body: String,
}

/// Owns every buffer for one compile pass: the stack of open scopes, the
/// per-tag occurrence counters, and the finished definitions awaiting the
/// final flush.
#[derive(Debug, Default)]
pub struct ChildBuffers {
    open: Vec<ChildBuffer>,
    finished: Vec<String>,
    counters: HashMap<String, u32>,
}

impl ChildBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open component scopes.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Assign the next occurrence index for `tag`, 1-based in document
    /// order. Only start tags consume an index.
    pub fn next_occurrence(&mut self, tag: &str) -> u32 {
        let counter = self.counters.entry(tag.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Open a scope for `tag`, seeding the buffer with the block-definition
    /// header for `block`.
    pub fn open(&mut self, tag: String, block: &str, open_span: Span) {
        let mut body = String::with_capacity(64 + block.len());
        body.push_str("\n{{ define \"");
        body.push_str(block);
        body.push_str("\" }}");
        self.open.push(ChildBuffer { tag, open_span, body });
    }

    /// The innermost open scope, if any.
    pub fn innermost(&self) -> Option<&ChildBuffer> {
        self.open.last()
    }

    /// Mutable body of the innermost open scope; `None` at top level.
    pub fn current_mut(&mut self) -> Option<&mut String> {
        self.open.last_mut().map(|buffer| &mut buffer.body)
    }

    /// Close the innermost scope: wrap its body with the definition footer,
    /// then either queue it for the final flush (scope closed at depth 1) or
    /// fold it into the parent's body. Callers check tag matching first.
    pub fn close(&mut self) {
        let Some(mut buffer) = self.open.pop() else {
            return;
        };
        buffer.body.push_str("{{ end }}\n");
        match self.open.last_mut() {
            Some(parent) => parent.body.push_str(&buffer.body),
            None => self.finished.push(buffer.body),
        }
    }

    /// Finalized depth-1 definitions in the order their scopes closed.
    pub fn finished(&self) -> impl Iterator<Item = &str> {
        self.finished.iter().map(String::as_str)
    }
}
