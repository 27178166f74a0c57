use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::annotations::{self, TestAnnotations};
use crate::blueprint::{self, Action, Blueprint, ExampleRequest, InputFormat, Parameter, Resource};
use crate::collection::{Collection, DataMode, Folder, Request};
use crate::error::{ConvertError, Result};
use crate::uri::{ParamEncoding, resolve_uri_with};

pub const DEFAULT_HOST: &str = "https://api.example.com/v1";
pub const DEFAULT_TESTS_FILENAME: &str = "blueman.tests.md";
pub const DEFAULT_OUTPUT_FILENAME: &str = "collection.json";

/// Source of folder and request ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> Uuid;
}

/// Fresh v4 ids for every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Counter-based ids, for reproducible output.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u128,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Uuid {
        self.next += 1;
        Uuid::from_u128(self.next)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub host: String,
    pub encoding: ParamEncoding,
    pub tests: TestAnnotations,
}

/// Everything a single run needs besides the host prompt.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: InputFormat,
    pub host: Option<String>,
    pub tests_file: Option<PathBuf>,
    pub encoding: ParamEncoding,
    pub pretty: bool,
}

pub struct Converter<G = RandomIds> {
    ids: G,
}

impl<G: IdGenerator> Converter<G> {
    pub fn new(ids: G) -> Self {
        Self { ids }
    }

    pub fn convert(&mut self, blueprint: &Blueprint, options: &ConvertOptions) -> Collection {
        self.convert_at(blueprint, options, Utc::now().timestamp())
    }

    /// Builds the collection with an explicit timestamp.
    ///
    /// Every action gets one id, shared by all requests generated from its
    /// examples, and appears once in its folder's `order`. Headers and body
    /// come from the last example request seen so far for the action, so an
    /// example without requests repeats the previous one. Actions without
    /// examples are listed in the folder but produce no request.
    pub fn convert_at(
        &mut self,
        blueprint: &Blueprint,
        options: &ConvertOptions,
        timestamp: i64,
    ) -> Collection {
        let collection_id = self.ids.next_id();
        let mut folders = Vec::with_capacity(blueprint.resource_groups.len());
        let mut requests = Vec::new();

        for group in &blueprint.resource_groups {
            let folder_id = self.ids.next_id();
            let mut order = Vec::new();

            for resource in &group.resources {
                debug!(
                    group = %group.name,
                    resource = %resource.name,
                    uri = %resource.uri_template,
                    "converting resource"
                );
                for action in &resource.actions {
                    let action_id = self.ids.next_id();
                    order.push(action_id);

                    if action.examples.is_empty() {
                        continue;
                    }

                    let url = build_url(&options.host, resource, action, options.encoding);
                    let tests = options.tests.script_for(&action.name);
                    let mut last: Option<&ExampleRequest> = None;

                    for example in &action.examples {
                        if let Some(request) = example.requests.last() {
                            last = Some(request);
                        }
                        requests.push(Request {
                            id: action_id,
                            url: url.clone(),
                            name: resource.uri_template.clone(),
                            method: action.method.clone(),
                            headers: last.map(format_headers).unwrap_or_default(),
                            data: last.and_then(|req| req.body.clone()).unwrap_or_default(),
                            data_mode: DataMode::Raw,
                            collection_id,
                            tests: tests.clone(),
                        });
                    }
                }
            }

            folders.push(Folder {
                id: folder_id,
                name: group.name.clone(),
                description: group.description.clone(),
                order,
                collection_name: blueprint.name.clone(),
                collection_id,
            });
        }

        Collection {
            id: collection_id,
            name: blueprint.name.clone(),
            description: blueprint.description.clone(),
            order: Vec::new(),
            folders,
            timestamp,
            synced: false,
            requests,
        }
    }
}

fn build_url(host: &str, resource: &Resource, action: &Action, encoding: ParamEncoding) -> String {
    let parameters = merge_parameters(&action.parameters, &resource.parameters);
    let path = resolve_uri_with(&resource.uri_template, &parameters, encoding);
    if path.contains('{') {
        warn!(
            template = %resource.uri_template,
            resolved = %path,
            "URI placeholders left unresolved"
        );
    }
    format!("{}{}", host.trim_end_matches('/'), path)
}

/// Action parameters first, then resource parameters the action does not
/// redeclare.
pub fn merge_parameters(action: &[Parameter], resource: &[Parameter]) -> Vec<Parameter> {
    let declared: HashSet<&str> = action.iter().map(|param| param.name.as_str()).collect();
    action
        .iter()
        .chain(resource.iter().filter(|param| !declared.contains(param.name.as_str())))
        .cloned()
        .collect()
}

fn format_headers(request: &ExampleRequest) -> String {
    request
        .headers
        .iter()
        .map(|header| format!("{}: {}", header.name, header.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Explicit host first, then the blueprint's `HOST` metadata.
pub fn resolve_host(explicit: Option<&str>, blueprint: &Blueprint) -> Option<String> {
    explicit
        .filter(|host| !host.is_empty())
        .or_else(|| blueprint.host())
        .map(str::to_string)
}

pub fn write_collection(collection: &Collection, path: &Path, pretty: bool) -> Result<()> {
    let json = collection.to_json(pretty)?;
    fs::write(path, json).map_err(|source| ConvertError::WriteFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub collection: Collection,
    /// Tests file that was requested but could not be read.
    pub tests_skipped: Option<PathBuf>,
}

/// Load, convert and write in one go. `prompt_host` is consulted only when
/// neither the config nor the blueprint names a host.
pub fn run<G, F>(config: &ConvertConfig, ids: G, prompt_host: F) -> Result<RunOutcome>
where
    G: IdGenerator,
    F: FnOnce() -> String,
{
    let blueprint = blueprint::load_document(&config.input, config.format)?;
    let host = resolve_host(config.host.as_deref(), &blueprint).unwrap_or_else(prompt_host);

    let mut tests_skipped = None;
    let tests = match config.tests_file.as_deref() {
        Some(path) => annotations::parse_file(path).unwrap_or_else(|err| {
            info!("no tests attached: could not read {}: {err}", path.display());
            tests_skipped = Some(path.to_path_buf());
            TestAnnotations::default()
        }),
        None => TestAnnotations::default(),
    };

    let options = ConvertOptions {
        host,
        encoding: config.encoding,
        tests,
    };
    let collection = Converter::new(ids).convert(&blueprint, &options);
    write_collection(&collection, &config.output, config.pretty)?;
    info!(
        path = %config.output.display(),
        requests = collection.requests.len(),
        "collection written"
    );
    Ok(RunOutcome {
        collection,
        tests_skipped,
    })
}
