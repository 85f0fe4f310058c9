//! Variable environment and `{{ expr }}` template rendering.
//!
//! # Design
//! Variables are `serde_json::Value`s so a binding can hold a scalar or a
//! whole structure (for example a decoded response body) and templates can
//! reach into it with a dotted path: `{{ user.id }}`, `{{ items.0.name }}`.
//!
//! Rendering is strict. An unknown name is an error rather than an empty
//! string, and anything that is not a plain dotted path inside the braces
//! (filters, calls, statement blocks) is rejected as a syntax error instead
//! of being sent over the wire verbatim.
//!
//! This is a subset of Jinja-style templating: only `{{ dotted.path }}`
//! substitution is implemented. Filters (`{{ x | upper }}`), calls and
//! `{% %}`/`{# #}` blocks are syntax errors, so a declaration relying on them
//! ends up in `ERROR` rather than rendering.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Named variables available to templates.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Register every pair in order; later pairs override earlier ones.
    pub fn extend<I, K, V>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in bindings {
            self.register(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Render every string inside `value`, returning a structurally identical
    /// copy. Object keys and non-string scalars are left as they are.
    pub fn render(&self, value: &Value) -> Result<Value, TemplateError> {
        match value {
            Value::String(s) => self.render_str(s).map(Value::String),
            Value::Array(items) => items
                .iter()
                .map(|item| self.render(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(fields) => {
                let mut rendered = serde_json::Map::with_capacity(fields.len());
                for (key, field) in fields {
                    rendered.insert(key.clone(), self.render(field)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }

    pub fn render_str(&self, template: &str) -> Result<String, TemplateError> {
        reject_blocks(template)?;

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let inner = &rest[start + OPEN.len()..];
            let end = inner
                .find(CLOSE)
                .ok_or_else(|| TemplateError::Syntax(format!("unclosed '{OPEN}' in '{template}'")))?;
            let expr = &inner[..end];
            if expr.contains(OPEN) {
                return Err(TemplateError::Syntax(format!("nested '{OPEN}' in '{template}'")));
            }
            push_value(&mut out, self.lookup(expr.trim())?);
            rest = &inner[end + CLOSE.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, expr: &str) -> Result<&Value, TemplateError> {
        if expr.is_empty() {
            return Err(TemplateError::Syntax("empty expression".to_string()));
        }

        let mut segments = expr.split('.');
        // split always yields at least one segment
        let root = segments.next().unwrap_or_default();
        if !is_identifier(root) {
            return Err(unsupported(expr));
        }
        let mut current = self
            .variables
            .get(root)
            .ok_or_else(|| TemplateError::UndefinedVariable(root.to_string()))?;

        for segment in segments {
            let next = if is_identifier(segment) {
                current.get(segment)
            } else if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                segment.parse::<usize>().ok().and_then(|index| current.get(index))
            } else {
                return Err(unsupported(expr));
            };
            current = next.ok_or_else(|| TemplateError::UndefinedVariable(expr.to_string()))?;
        }
        Ok(current)
    }
}

fn reject_blocks(template: &str) -> Result<(), TemplateError> {
    for opener in ["{%", "{#"] {
        if template.contains(opener) {
            return Err(TemplateError::Syntax(format!(
                "'{opener}' blocks are not supported in '{template}'"
            )));
        }
    }
    Ok(())
}

fn unsupported(expr: &str) -> TemplateError {
    TemplateError::Syntax(format!("unsupported expression '{expr}'"))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}
