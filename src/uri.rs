//! URI template expansion for blueprint resources.
//!
//! Supports `{name}` path placeholders and a single `{?a,b}` query block.
//! Values come from the parameters' example fields.

use regex::Regex;
use std::sync::LazyLock;

use crate::blueprint::Parameter;

static QUERY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\?([^}]*)\}").expect("valid query block pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamEncoding {
    /// Substitute example values verbatim.
    #[default]
    Raw,
    /// Percent-encode example values before substitution.
    Percent,
}

impl ParamEncoding {
    fn apply(self, value: &str) -> String {
        match self {
            ParamEncoding::Raw => value.to_string(),
            ParamEncoding::Percent => urlencoding::encode(value).into_owned(),
        }
    }
}

pub fn resolve_uri(template: &str, parameters: &[Parameter]) -> String {
    resolve_uri_with(template, parameters, ParamEncoding::Raw)
}

/// Expands the query block first, then substitutes path placeholders in the
/// result. Placeholders without a matching parameter stay in place.
pub fn resolve_uri_with(template: &str, parameters: &[Parameter], encoding: ParamEncoding) -> String {
    let mut uri = template.to_string();

    if template.contains("{?") {
        uri = expand_query_block(&uri, parameters, encoding);
    }

    if uri.contains('{') {
        uri = substitute_path(&uri, parameters, encoding);
    }

    uri
}

/// Only the first `{?...}` block is expanded; later ones are left untouched.
fn expand_query_block(uri: &str, parameters: &[Parameter], encoding: ParamEncoding) -> String {
    let Some(caps) = QUERY_BLOCK.captures(uri) else {
        return uri.to_string();
    };
    let (Some(block), Some(names)) = (caps.get(0), caps.get(1)) else {
        return uri.to_string();
    };

    let pairs: Vec<String> = names
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let value = parameters
                .iter()
                .find(|param| param.name == name)
                .and_then(Parameter::example_value);
            match value {
                Some(value) => format!("{name}={}", encoding.apply(&value)),
                None => name.to_string(),
            }
        })
        .collect();

    let mut out = String::with_capacity(uri.len());
    out.push_str(&uri[..block.start()]);
    if !pairs.is_empty() {
        out.push('?');
        out.push_str(&pairs.join("&"));
    }
    out.push_str(&uri[block.end()..]);
    out
}

fn substitute_path(uri: &str, parameters: &[Parameter], encoding: ParamEncoding) -> String {
    let mut out = uri.to_string();
    for param in parameters {
        let Some(value) = param.example_value() else {
            continue;
        };
        out = out.replace(&format!("{{{}}}", param.name), &encoding.apply(&value));
    }
    out
}
