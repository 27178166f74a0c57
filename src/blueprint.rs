//! Typed view of the API Blueprint AST as emitted by the blueprint parser
//! (`drafter --type ast`). Loading validates the document shape up front so the
//! converter never walks a half-formed tree.

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{ConvertError, Result};

const MIN_AST_VERSION: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// `{ "ast": { ... } }` wrapper produced by current parser releases.
    #[default]
    Ast,
    /// Flat document carrying `_version` at the root.
    Legacy,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    pub resource_groups: Vec<ResourceGroup>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResourceGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    pub uri_template: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Action {
    pub method: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Example {
    #[serde(default)]
    pub requests: Vec<ExampleRequest>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExampleRequest {
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, example: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            example: Some(example.into()),
        }
    }

    /// Example value in URL form. Empty strings and nulls count as absent;
    /// numbers and booleans use their JSON text.
    pub fn example_value(&self) -> Option<String> {
        match self.example.as_ref()? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Blueprint {
    /// First `HOST` metadata value, if the blueprint declares one.
    pub fn host(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|meta| meta.name == "HOST")
            .map(|meta| meta.value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Reads and validates a blueprint document from disk.
pub fn load_document(path: &Path, format: InputFormat) -> Result<Blueprint> {
    if !path.is_file() {
        return Err(ConvertError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|err| {
        ConvertError::InvalidFormat(format!("could not read {}: {err}", path.display()))
    })?;
    let doc = decode(path, &raw)?;
    let ast = extract_ast(doc, format)?;

    let blueprint: Blueprint = serde_json::from_value(ast).map_err(|err| {
        ConvertError::InvalidFormat(format!(
            "{} does not match the API Blueprint AST layout: {err}",
            path.display()
        ))
    })?;
    debug!(
        name = %blueprint.name,
        groups = blueprint.resource_groups.len(),
        "loaded blueprint"
    );
    Ok(blueprint)
}

fn decode(path: &Path, raw: &str) -> Result<Value> {
    let yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    if yaml {
        serde_yaml::from_str(raw).map_err(|err| {
            ConvertError::InvalidFormat(format!("invalid YAML in {}: {err}", path.display()))
        })
    } else {
        serde_json::from_str(raw).map_err(|err| {
            ConvertError::InvalidFormat(format!("invalid JSON in {}: {err}", path.display()))
        })
    }
}

/// Picks the AST root out of a decoded document and checks its version.
pub fn extract_ast(mut doc: Value, format: InputFormat) -> Result<Value> {
    if let Some(ast) = doc.get_mut("ast").map(Value::take) {
        check_version(ast.get("_version"), false)?;
        return Ok(ast);
    }

    match format {
        InputFormat::Ast => Err(ConvertError::not_ast()),
        InputFormat::Legacy => {
            check_version(doc.get("_version"), true)?;
            Ok(doc)
        }
    }
}

fn check_version(value: Option<&Value>, required: bool) -> Result<()> {
    let Some(value) = value else {
        if required {
            return Err(ConvertError::outdated_version("none"));
        }
        return Ok(());
    };

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match parse_version(&text) {
        Some(version) if version >= MIN_AST_VERSION => Ok(()),
        _ => Err(ConvertError::outdated_version(&text)),
    }
}

fn parse_version(input: &str) -> Option<f64> {
    let mut parts = input.trim().split('.');
    let major = parts.next()?;
    match parts.next() {
        Some(minor) => format!("{major}.{minor}").parse().ok(),
        None => major.parse().ok(),
    }
}
