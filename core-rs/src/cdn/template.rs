//! Placeholder substitution for config templates
//!
//! Syntax:
//! - `$name` / `${name}` - replaced by the value bound to `name`
//! - `$$` - a literal `$` (nginx variables are written `$$uri`)
//!
//! Substitution is strict: an unbound placeholder or a stray `$` is an error.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::errors::{EnvError, Result};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))")
        .expect("placeholder pattern is valid")
});

/// Parsed template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Placeholder names used by the template, in order of first use
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.text) {
            if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
                if !names.iter().any(|n| n == name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
        names
    }

    /// Substitute every placeholder
    ///
    /// # Errors
    /// `Template` if a placeholder has no value or a `$` is not followed by
    /// a name, `{name}` or `$`
    pub fn substitute(&self, values: &HashMap<&str, String>) -> Result<String> {
        let mut failure: Option<EnvError> = None;

        let rendered = PLACEHOLDER.replace_all(&self.text, |caps: &Captures| {
            if caps.name("escaped").is_some() {
                return "$".to_string();
            }
            if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
                if let Some(value) = values.get(name.as_str()) {
                    return value.clone();
                }
                failure.get_or_insert_with(|| {
                    EnvError::Template(format!("No value for placeholder '{}'", name.as_str()))
                });
                return String::new();
            }

            let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let (line, column) = line_and_column(&self.text, offset);
            failure.get_or_insert_with(|| {
                EnvError::Template(format!("Invalid placeholder at line {}, column {}", line, column))
            });
            String::new()
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line, column)
}
