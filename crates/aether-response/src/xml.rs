//! XML serialization of nested maps and sequences.

use serde_json::Value;

/// XML declaration written before the element tree.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Element name used for numeric keys and sequence entries.
pub const ITEM_ELEMENT: &str = "item";

/// Serialize a value as an XML document.
///
/// Object keys become element names, numeric keys and array entries become
/// `<item>`, and scalars become text. A scalar at the top level produces an
/// empty document.
pub fn to_xml(value: &Value) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push('\n');
    write_children(&mut out, value);
    out.push('\n');
    out
}

/// Serialize only the element tree, without the declaration.
pub fn to_xml_fragment(value: &Value) -> String {
    let mut out = String::new();
    write_children(&mut out, value);
    out
}

fn write_children(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if is_numeric(key) {
                    ITEM_ELEMENT.to_string()
                } else {
                    element_name(key)
                };
                write_element(out, &name, child);
            }
        }
        Value::Array(items) => {
            for child in items {
                write_element(out, ITEM_ELEMENT, child);
            }
        }
        _ => {}
    }
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        Value::Object(_) | Value::Array(_) => write_children(out, value),
        scalar => escape_text(out, &scalar_text(scalar)),
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => String::new(),
    }
}

fn is_numeric(key: &str) -> bool {
    let trimmed = key.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Turn an arbitrary key into a well-formed element name.
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
