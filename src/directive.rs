//! Block-invocation directive assembly.

use crate::entities::decode_entities;
use crate::tokenizer::{Attr, Span};
use crate::values;

/// A component attribute whose value failed to translate.
#[derive(Debug)]
pub struct AttributeError {
    pub attribute: String,
    pub span: Span,
    pub source: serde_json::Error,
}

/// Build the invocation replacing one component tag.
///
/// `block` is the component's own block name (prefix already stripped,
/// lowercased); `child_block` carries the synthesized children block name
/// for start tags. Attribute names lowercase into dictionary keys in source
/// order; values are entity-decoded and translated. The first attribute is
/// always an argument, later attributes are dropped when their value is
/// empty, and duplicate names pass through for the engine to resolve.
pub fn build_call(
    block: &str,
    child_block: Option<&str>,
    attrs: &[Attr<'_>],
) -> Result<String, AttributeError> {
    let mut out = String::new();
    out.push_str("{{ template \"");
    out.push_str(block);
    out.push('"');

    if attrs.is_empty() && child_block.is_none() {
        out.push_str(" }}");
        return Ok(out);
    }

    out.push_str(" dict");
    for (i, attr) in attrs.iter().enumerate() {
        let decoded = decode_entities(attr.value_or_empty());
        if i > 0 && decoded.is_empty() {
            continue;
        }
        out.push_str(" \"");
        out.push_str(&attr.name.to_ascii_lowercase());
        out.push_str("\" ");
        values::translate(&decoded, &mut out).map_err(|source| AttributeError {
            attribute: attr.name.to_string(),
            span: attr.span,
            source,
        })?;
    }
    if let Some(child) = child_block {
        out.push_str(" \"children\" (children \"");
        out.push_str(child);
        out.push_str("\" .)");
    }
    out.push_str(" }}");
    Ok(out)
}
