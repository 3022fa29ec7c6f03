//! Document serialization (RFC 5545).

use super::escape::escape_param_value;
use super::fold::fold_line;
use crate::core::{Component, Property};

/// Renders a single property to an unfolded content line.
#[must_use]
pub fn serialize_property(prop: &Property) -> String {
    let mut line = prop.name.clone();
    for param in &prop.params {
        line.push(';');
        line.push_str(&param.name);
        line.push('=');
        let values: Vec<String> = param.values.iter().map(|v| escape_param_value(v)).collect();
        line.push_str(&values.join(","));
    }
    line.push(':');
    line.push_str(prop.raw_value());
    line
}

/// Serializes a component subtree to folded CRLF-terminated text.
///
/// Properties render in stored order; children reuse their own memos where
/// clean, so re-serializing after a localized mutation only re-renders the
/// mutated path.
#[must_use]
pub fn serialize_component(component: &Component) -> String {
    let mut out = String::new();
    out.push_str(&fold_line(&format!("BEGIN:{}", component.name())));
    out.push_str("\r\n");

    for prop in component.properties() {
        out.push_str(&fold_line(&serialize_property(prop)));
        out.push_str("\r\n");
    }

    for child in component.children() {
        out.push_str(&child.serialized());
    }

    out.push_str(&fold_line(&format!("END:{}", component.name())));
    out.push_str("\r\n");
    out
}
