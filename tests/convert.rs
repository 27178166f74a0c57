use blueman::annotations;
use blueman::blueprint::{InputFormat, load_document};
use blueman::convert::{self, ConvertConfig, SequentialIds};
use blueman::error::ConvertError;
use blueman::uri::ParamEncoding;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config(input: PathBuf, output: PathBuf) -> ConvertConfig {
    ConvertConfig {
        input,
        output,
        format: InputFormat::Ast,
        host: None,
        tests_file: Some(fixture("api.test.md")),
        encoding: ParamEncoding::Raw,
        pretty: false,
    }
}

fn no_prompt() -> String {
    panic!("host should come from blueprint metadata")
}

#[test]
fn test_annotations_fixture() {
    let parsed = annotations::parse_file(&fixture("api.test.md")).unwrap();

    assert!(!parsed.prepend.is_empty());
    let keys: Vec<&str> = parsed.tests_by_action.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Create a Player", "Example 1"]);
    assert!(!parsed.tests_by_action["Create a Player"].is_empty());
    assert!(!parsed.tests_by_action.contains_key("Another action"));
    assert!(!parsed.tests_by_action.contains_key("Example 0"));
    assert!(!parsed.tests_by_action.contains_key("Example 2"));
}

#[test]
fn test_convert_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("collection.json");
    let collection = convert::run(
        &config(fixture("api.json"), output.clone()),
        SequentialIds::default(),
        no_prompt,
    )
    .unwrap()
    .collection;

    assert_eq!(collection.name, "Flunkyball API");
    assert_eq!(collection.folders.len(), 2);
    assert_eq!(collection.folders[0].order.len(), 3);
    assert_eq!(collection.folders[1].order.len(), 2);
    assert!(collection.order.is_empty());

    let urls: Vec<&str> = collection.requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.flunkyball.example.com/v1/players?name=John&age=25",
            "https://api.flunkyball.example.com/v1/players?name=John&age=25",
            "https://api.flunkyball.example.com/v1/players?name=John&age=25",
            "https://api.flunkyball.example.com/v1/players/John",
            "https://api.flunkyball.example.com/v1/players/John/games/52387?filter=flunkyball&locale=US",
        ]
    );

    for request in &collection.requests {
        assert_eq!(request.collection_id, collection.id);
    }

    let create: Vec<_> = collection
        .requests
        .iter()
        .filter(|r| r.method == "POST")
        .collect();
    assert_eq!(create.len(), 2);
    assert_eq!(create[0].id, create[1].id);
    assert_eq!(create[0].id, collection.folders[0].order[1]);
    assert_eq!(create[1].headers, "Content-Type: application/json\nX-Request-Id: 42");
    assert_eq!(create[1].data, "{ \"name\": \"Jane\" }\n");
    let script = create[0].tests.as_deref().unwrap();
    assert!(script.starts_with("var data = JSON.parse(responseBody);\n"));
    assert!(script.contains("Status code is 201"));

    assert!(collection.requests.iter().filter(|r| r.method != "POST").all(|r| r.tests.is_none()));

    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["requests"][0]["dataMode"], "raw");
    assert_eq!(written["synced"], false);
    assert_eq!(written["folders"][0]["collection_name"], "Flunkyball API");
}

#[test]
fn test_output_is_stable_apart_from_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    for output in [&first, &second] {
        convert::run(
            &config(fixture("api.json"), output.clone()),
            SequentialIds::default(),
            no_prompt,
        )
        .unwrap();
    }

    let mut a: Value = serde_json::from_str(&fs::read_to_string(&first).unwrap()).unwrap();
    let mut b: Value = serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
    a.as_object_mut().unwrap().remove("timestamp");
    b.as_object_mut().unwrap().remove("timestamp");
    assert_eq!(a, b);
}

#[test]
fn test_explicit_host_and_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(fixture("api.json"), dir.path().join("out.json"));
    cfg.host = Some("http://localhost:8080".into());
    let collection = convert::run(&cfg, SequentialIds::default(), no_prompt)
        .unwrap()
        .collection;
    assert!(collection.requests[0].url.starts_with("http://localhost:8080/players"));

    let mut cfg = config(fixture("api_legacy.json"), dir.path().join("legacy.json"));
    cfg.format = InputFormat::Legacy;
    cfg.tests_file = None;
    let collection = convert::run(&cfg, SequentialIds::default(), || "unused".into())
        .unwrap()
        .collection;
    assert_eq!(collection.requests[0].url, "http://legacy.example.com/players/John");
}

#[test]
fn test_prompted_host_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("api.json");
    fs::write(
        &input,
        r#"{
  "ast": {
    "name": "No Host API",
    "metadata": [{ "name": "FORMAT", "value": "1A" }],
    "resourceGroups": [{
      "name": "Players",
      "resources": [{
        "uriTemplate": "/players/{name}",
        "actions": [{
          "method": "GET",
          "name": "Retrieve a Player",
          "parameters": [{ "name": "name", "example": "John" }],
          "examples": [{ "requests": [] }]
        }]
      }]
    }]
  }
}"#,
    )
    .unwrap();

    let mut cfg = config(input, dir.path().join("out.json"));
    cfg.tests_file = None;
    let outcome = convert::run(&cfg, SequentialIds::default(), || {
        "https://prompted.example.com".to_string()
    })
    .unwrap();
    assert_eq!(
        outcome.collection.requests[0].url,
        "https://prompted.example.com/players/John"
    );
}

#[test]
fn test_missing_tests_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(fixture("api.json"), dir.path().join("out.json"));
    let tests_file = fixture("nope.md");
    cfg.tests_file = Some(tests_file.clone());

    let outcome = convert::run(&cfg, SequentialIds::default(), no_prompt).unwrap();
    assert_eq!(outcome.tests_skipped, Some(tests_file));
    assert!(outcome.collection.requests.iter().all(|r| r.tests.is_none()));

    let mut cfg = config(fixture("api.json"), dir.path().join("with-tests.json"));
    cfg.host = Some("http://localhost".into());
    let outcome = convert::run(&cfg, SequentialIds::default(), no_prompt).unwrap();
    assert_eq!(outcome.tests_skipped, None);
}

#[test]
fn test_missing_input_names_path() {
    let path = fixture("xxx.json");
    let err = load_document(&path, InputFormat::Ast).unwrap_err();
    assert!(matches!(err, ConvertError::InputNotFound { .. }));
    let message = err.to_string();
    assert!(message.contains("API Blueprint file ["));
    assert!(message.contains(&path.display().to_string()));
}

#[test]
fn test_non_ast_input_rejected() {
    let err = load_document(&fixture("api_non-ast.json"), InputFormat::Ast).unwrap_err();
    assert!(err
        .to_string()
        .contains("Your API Blueprint file is not in the AST format."));
}

#[test]
fn test_legacy_version_checks() {
    assert!(load_document(&fixture("api_legacy.json"), InputFormat::Legacy).is_ok());

    let err = load_document(&fixture("api_legacy_old.json"), InputFormat::Legacy).unwrap_err();
    assert!(err.to_string().contains("Snow Crash 0.9.0 or higher"));
}

#[test]
fn test_yaml_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("api.yaml");
    fs::write(
        &path,
        r#"
ast:
  _version: "4.0"
  name: YAML API
  metadata: []
  resourceGroups:
    - name: Things
      resources:
        - uriTemplate: /things/{id}
          actions:
            - method: GET
              name: Get thing
              parameters:
                - name: id
                  example: 7
              examples:
                - requests: []
"#,
    )
    .unwrap();

    let blueprint = load_document(&path, InputFormat::Ast).unwrap();
    assert_eq!(blueprint.name, "YAML API");
    let action = &blueprint.resource_groups[0].resources[0].actions[0];
    assert_eq!(action.parameters[0].example_value().as_deref(), Some("7"));
}

#[test]
fn test_write_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing-dir").join("collection.json");
    let err = convert::run(
        &config(fixture("api.json"), output.clone()),
        SequentialIds::default(),
        no_prompt,
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::WriteFailure { .. }));
    assert!(err.to_string().contains(&output.display().to_string()));
}
