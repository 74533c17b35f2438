//! Literal helpers shared by the compilers

use once_cell::sync::Lazy;
use regex::Regex;

static IRI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>"{}|^`\\]*$"#)
        .unwrap_or_else(|e| panic!("invalid IRI pattern: {e}"))
});

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("invalid identifier pattern: {e}"))
});

/// Separator of compound type strings such as `airport::place`
pub const TYPE_SEPARATOR: &str = "::";

/// Split a possibly compound type into its labels
pub fn split_types(type_str: &str) -> Vec<&str> {
    type_str
        .split(TYPE_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split every type of a list, keeping first occurrence order
pub fn split_all_types(types: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for label in types.iter().flat_map(|t| split_types(t)) {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// Canonical numeric literal, `None` when the text is not a finite number
pub fn number_literal(text: &str) -> Option<String> {
    let n = text.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{n}"))
    }
}

/// Boolean literal, `None` unless the text is `true` or `false`
pub fn boolean_literal(text: &str) -> Option<&'static str> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some("true"),
        "false" => Some("false"),
        _ => None,
    }
}

/// Double-quoted string literal with C-style escapes
pub fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn is_iri(text: &str) -> bool {
    IRI_RE.is_match(text)
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER_RE.is_match(text)
}

/// Regex matching `term` literally, as a pattern string
pub fn literal_pattern(term: &str) -> String {
    regex::escape(term)
}
