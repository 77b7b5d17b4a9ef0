//! Component tag classification and block naming.

/// True when `name` carries the reserved component prefix. Tag names are
/// ASCII, so the comparison is byte-wise and case-insensitive.
pub fn is_component(name: &str, prefix: &str) -> bool {
    let p = prefix.as_bytes();
    name.len() >= p.len() && name.as_bytes()[..p.len()].eq_ignore_ascii_case(p)
}

/// Block name invoked for a component: the tag name with the prefix
/// stripped. Callers pass an already-lowercased tag name.
pub fn block_name<'a>(tag: &'a str, prefix: &str) -> &'a str {
    &tag[prefix.len()..]
}

/// Name of the block that holds a component's children, unique per
/// (tag name, occurrence index).
pub fn child_block_name(tag: &str, occurrence: u32) -> String {
    format!("{tag}-children-{occurrence}")
}
