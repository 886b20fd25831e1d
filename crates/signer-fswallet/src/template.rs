//! Dotted-path text templates for metadata file resolution.
//!
//! A template is literal text with `{{ .a.b.c }}` placeholders. Rendering
//! looks each path up in a parsed metadata document and substitutes the
//! scalar found there. An unresolved placeholder is an error, never silent
//! empty output: a mis-typed property name must not quietly produce a
//! wrong file path.
//!
//! ```
//! use evm_signer_fswallet::template::Template;
//! use serde_json::json;
//!
//! let t = Template::parse("{{ .signing.keyFile }}").unwrap();
//! let metadata = json!({"signing": {"keyFile": "/keys/a.json"}});
//! assert_eq!(t.render(&metadata).unwrap(), "/keys/a.json");
//! assert!(t.render(&json!({})).is_err());
//! ```

use evm_signer_core::{Error, Result};
use serde_json::Value;

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Lookup(Vec<String>),
}

impl Template {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadTemplate`] for unbalanced braces or empty
    /// lookup paths.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if !rest[..open].is_empty() {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open.find("}}").ok_or_else(|| {
                Error::BadTemplate(format!("{source}: unterminated placeholder"))
            })?;
            let path = parse_path(source, after_open[..close].trim())?;
            segments.push(Segment::Lookup(path));
            rest = &after_open[close + 2..];
        }
        if rest.contains("}}") {
            return Err(Error::BadTemplate(format!(
                "{source}: unmatched closing braces"
            )));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Renders the template against a metadata document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadTemplate`] when a placeholder path is missing
    /// from the document or resolves to a non-scalar value.
    pub fn render(&self, metadata: &Value) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Lookup(path) => {
                    let value = lookup(metadata, path).ok_or_else(|| {
                        Error::BadTemplate(format!(
                            "{}: no value at .{}",
                            self.source,
                            path.join(".")
                        ))
                    })?;
                    out.push_str(&scalar_to_string(value).ok_or_else(|| {
                        Error::BadTemplate(format!(
                            "{}: .{} is not a scalar",
                            self.source,
                            path.join(".")
                        ))
                    })?);
                }
            }
        }
        Ok(out)
    }
}

fn parse_path(source: &str, token: &str) -> Result<Vec<String>> {
    let token = token.strip_prefix('.').unwrap_or(token);
    if token.is_empty() {
        return Err(Error::BadTemplate(format!("{source}: empty placeholder")));
    }
    let parts: Vec<String> = token.split('.').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(Error::BadTemplate(format!(
            "{source}: malformed path .{token}"
        )));
    }
    Ok(parts)
}

fn lookup<'a>(metadata: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = metadata;
    for key in path {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_nested_lookup() {
        let t = Template::parse("{{ .signing.keyFile }}").unwrap();
        let metadata = json!({"signing": {"keyFile": "/keys/wallet.json"}});
        assert_eq!(t.render(&metadata).unwrap(), "/keys/wallet.json");
    }

    #[test]
    fn renders_mixed_literals() {
        let t = Template::parse("/base/{{ .dir }}/{{ .file }}.json").unwrap();
        let metadata = json!({"dir": "keys", "file": "wallet"});
        assert_eq!(t.render(&metadata).unwrap(), "/base/keys/wallet.json");
    }

    #[test]
    fn renders_numbers_and_bools() {
        let t = Template::parse("{{ .index }}-{{ .active }}").unwrap();
        let metadata = json!({"index": 7, "active": true});
        assert_eq!(t.render(&metadata).unwrap(), "7-true");
    }

    #[test]
    fn missing_value_is_an_error() {
        let t = Template::parse("{{ .missing }}").unwrap();
        let err = t.render(&json!({"present": 1})).unwrap_err();
        assert!(matches!(err, Error::BadTemplate(_)));
    }

    #[test]
    fn non_scalar_is_an_error() {
        let t = Template::parse("{{ .obj }}").unwrap();
        assert!(t.render(&json!({"obj": {"x": 1}})).is_err());
        assert!(t.render(&json!({"obj": [1, 2]})).is_err());
    }

    #[test]
    fn parse_rejects_malformed_templates() {
        assert!(Template::parse("{{ .open").is_err());
        assert!(Template::parse("stray }} close").is_err());
        assert!(Template::parse("{{ }}").is_err());
        assert!(Template::parse("{{ .a..b }}").is_err());
    }

    #[test]
    fn literal_only_template() {
        let t = Template::parse("/fixed/path.json").unwrap();
        assert_eq!(t.render(&json!({})).unwrap(), "/fixed/path.json");
    }
}
