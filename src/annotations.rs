//! Test scripts attached to requests, read from a companion Markdown file.
//!
//! Fenced code under a `##` heading is shared by every request; fenced code
//! under a `###` heading belongs to the action with that exact name.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestAnnotations {
    pub prepend: String,
    pub tests_by_action: BTreeMap<String, String>,
}

impl TestAnnotations {
    /// Full script for an action: the shared prelude followed by the action's
    /// own tests. `None` when the action has no tests of its own.
    pub fn script_for(&self, action: &str) -> Option<String> {
        self.tests_by_action
            .get(action)
            .map(|tests| format!("{}{}", self.prepend, tests))
    }
}

#[derive(Debug)]
enum Section {
    None,
    Prepend,
    Action(String),
}

/// Reads and parses a tests file. Read failures are left to the caller,
/// which treats them as "no tests".
pub fn parse_file(path: &Path) -> io::Result<TestAnnotations> {
    let raw = fs::read_to_string(path)?;
    let annotations = parse_str(&raw);
    debug!(
        path = %path.display(),
        actions = annotations.tests_by_action.len(),
        "parsed test annotations"
    );
    Ok(annotations)
}

pub fn parse_str(markdown: &str) -> TestAnnotations {
    let mut prepend = String::new();
    let mut tests: BTreeMap<String, String> = BTreeMap::new();
    let mut section = Section::None;
    let mut in_code = false;

    for line in markdown.lines() {
        if is_fence(line) {
            in_code = !in_code;
            continue;
        }

        if in_code {
            match &section {
                Section::Prepend => push_line(&mut prepend, line),
                Section::Action(name) => push_line(tests.entry(name.clone()).or_default(), line),
                Section::None => {}
            }
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let text = caps.get(2).map_or("", |m| m.as_str()).trim();
            section = match level {
                2 => Section::Prepend,
                3 => Section::Action(text.to_string()),
                _ => Section::None,
            };
        }
    }

    tests.retain(|_, script| !script.trim().is_empty());
    if prepend.trim().is_empty() {
        prepend.clear();
    }

    TestAnnotations {
        prepend,
        tests_by_action: tests,
    }
}

fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}
