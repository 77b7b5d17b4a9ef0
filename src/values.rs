//! Attribute-value translation into template-engine literals.
//!
//! One attribute value becomes exactly one of: a parenthesized pass-through
//! expression, a `(dict ...)` literal, a `(list ...)` literal, or a quoted
//! string. JSON members recurse through the same rule, so arbitrarily nested
//! object/array attributes flatten into nested `dict`/`list` calls.

use serde_json::{Map, Value};

/// Translate one raw attribute value, appending to `out`.
///
/// Values that open with `{` or `[` must decode as JSON; the decode error is
/// returned for the caller to attach tag/attribute context.
pub fn translate(value: &str, out: &mut String) -> Result<(), serde_json::Error> {
    if is_expression(value) {
        write_expression(value, out);
    } else if value.starts_with('{') {
        let object: Map<String, Value> = serde_json::from_str(value)?;
        write_object(&object, out);
    } else if value.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(value)?;
        write_array(&items, out);
    } else {
        write_string(value, out);
    }
    Ok(())
}

fn is_expression(value: &str) -> bool {
    value.len() >= 2 && value.as_bytes()[0] == b'{' && value.as_bytes()[1] == b'{'
}

/// `{{ .Foo }}` forwards as `( .Foo )`: delimiters stripped, inner content
/// untouched, parenthesized so it stays one argument.
fn write_expression(value: &str, out: &mut String) {
    let inner = value.get(2..value.len().saturating_sub(2)).unwrap_or("");
    out.push('(');
    out.push_str(inner);
    out.push(')');
}

/// Quoted string literal. Embedded quotes are not escaped; authored values
/// are trusted at this layer.
fn write_string(value: &str, out: &mut String) {
    out.push('"');
    out.push_str(value);
    out.push('"');
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            if is_expression(s) {
                write_expression(s, out);
            } else {
                write_string(s, out);
            }
        }
        Value::Array(items) => write_array(items, out),
        Value::Object(object) => write_object(object, out),
    }
}

fn write_array(items: &[Value], out: &mut String) {
    out.push_str("(list");
    for item in items {
        out.push(' ');
        write_value(item, out);
    }
    out.push(')');
}

fn write_object(object: &Map<String, Value>, out: &mut String) {
    out.push_str("(dict");
    for (key, value) in object {
        out.push_str(" \"");
        out.push_str(key);
        out.push_str("\" ");
        write_value(value, out);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(value: &str) -> String {
        let mut out = String::new();
        translate(value, &mut out).expect("value should translate");
        out
    }

    #[test]
    fn plain_strings_are_quoted() {
        assert_eq!(translated("Export"), "\"Export\"");
        assert_eq!(translated(""), "\"\"");
        assert_eq!(translated("md:ms-2"), "\"md:ms-2\"");
    }

    #[test]
    fn expressions_pass_through_parenthesized() {
        assert_eq!(translated("{{ .Foo }}"), "( .Foo )");
        assert_eq!(translated("{{.Items}}"), "(.Items)");
        assert_eq!(translated("{{ printf \"%d\" .N }}"), "( printf \"%d\" .N )");
    }

    #[test]
    fn short_expression_values_do_not_panic() {
        assert_eq!(translated("{{"), "()");
        assert_eq!(translated("{{}}"), "()");
    }

    #[test]
    fn json_objects_become_dict_literals() {
        assert_eq!(translated(r#"{"url": "/a"}"#), r#"(dict "url" "/a")"#);
        assert_eq!(
            translated(r#"{"a": 1, "b": true, "c": null}"#),
            r#"(dict "a" 1 "b" true "c" nil)"#
        );
        assert_eq!(translated("{}"), "(dict)");
    }

    #[test]
    fn json_arrays_become_list_literals() {
        assert_eq!(translated("[1, 2.5, -3]"), "(list 1 2.5 -3)");
        assert_eq!(translated(r#"["a", "b"]"#), r#"(list "a" "b")"#);
        assert_eq!(translated("[]"), "(list)");
    }

    #[test]
    fn nesting_recurses() {
        assert_eq!(
            translated(r#"[{ "url": "/assets/export/csv"}]"#),
            r#"(list (dict "url" "/assets/export/csv"))"#
        );
        assert_eq!(
            translated(r#"{"items": [1, {"x": []}]}"#),
            r#"(dict "items" (list 1 (dict "x" (list))))"#
        );
    }

    #[test]
    fn object_keys_keep_document_order() {
        assert_eq!(
            translated(r#"{"z": 1, "a": 2, "m": 3}"#),
            r#"(dict "z" 1 "a" 2 "m" 3)"#
        );
    }

    #[test]
    fn expression_strings_inside_json_pass_through() {
        assert_eq!(
            translated(r#"{"href": "{{ .URL }}"}"#),
            r#"(dict "href" ( .URL ))"#
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut out = String::new();
        assert!(translate("{not json}", &mut out).is_err());
        assert!(translate("[1, 2", &mut out).is_err());
        assert!(translate("{", &mut out).is_err());
    }

    #[test]
    fn json_must_match_its_opening_shape() {
        // An object value cannot decode where an array is announced.
        let mut out = String::new();
        assert!(translate("[1]", &mut out).is_ok());
        assert!(translate("{\"a\": 1}", &mut out).is_ok());
        assert!(translate("{\"a\"}", &mut out).is_err());
    }
}
