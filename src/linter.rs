//! Document linting - static analysis of OpenAPI documents.
//!
//! Reports data-quality defects that the engine otherwise tolerates silently:
//! - JSON/YAML syntax errors
//! - `$ref` pointers that do not resolve inside the document
//! - `pattern` values that are not valid regular expressions
//! - `required` names never declared in `properties`
//! - named schemas that take part in a reference cycle
//! - path template placeholders with no matching path parameter

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::endpoint::{path_placeholders, Method};
use crate::loader::load_document;
use crate::registry::REFERENCE_PREFIXES;

/// File extensions picked up when linting a directory.
const DOCUMENT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON Pointer to the issue (e.g., "/components/schemas/Pet/required")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json/.yaml/.yml files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let diagnostics = match load_document(file) {
        Ok(doc) => lint_document(&doc, file),
        Err(e) => vec![Diagnostic {
            severity: Severity::Error,
            code: "E001".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: format!("syntax error: {}", e),
        }],
    };

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.iter().any(|d| d.severity == Severity::Warning) {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Lint an already-loaded document.
pub fn lint_document(doc: &Value, file: &Path) -> Vec<Diagnostic> {
    let mut lint = Linter {
        doc,
        file,
        diagnostics: Vec::new(),
    };

    if doc.get("openapi").is_none() && doc.get("swagger").is_none() {
        lint.push(
            Severity::Error,
            "E001",
            "/".to_string(),
            "not an OpenAPI document: missing openapi or swagger field".to_string(),
        );
        return lint.diagnostics;
    }

    lint.walk(doc, "");
    lint.check_cycles();
    lint.check_path_parameters();
    lint.diagnostics
}

struct Linter<'a> {
    doc: &'a Value,
    file: &'a Path,
    diagnostics: Vec<Diagnostic>,
}

impl Linter<'_> {
    fn push(&mut self, severity: Severity, code: &str, path: String, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path,
            message,
        });
    }

    /// Recursive pass for `$ref`, `pattern` and `required` checks.
    fn walk(&mut self, value: &Value, path: &str) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    self.check_reference(reference, path);
                }

                if let Some(Value::String(pattern)) = map.get("pattern") {
                    if let Err(e) = Regex::new(pattern) {
                        self.push(
                            Severity::Error,
                            "E003",
                            format!("{}/pattern", path),
                            format!("invalid pattern \"{}\": {}", pattern, e),
                        );
                    }
                }

                if let (Some(Value::Array(required)), Some(Value::Object(properties))) =
                    (map.get("required"), map.get("properties"))
                {
                    for name in required.iter().filter_map(Value::as_str) {
                        if !properties.contains_key(name) {
                            self.push(
                                Severity::Warning,
                                "W001",
                                format!("{}/required", path),
                                format!("required property \"{}\" is not declared", name),
                            );
                        }
                    }
                }

                for (key, child) in map {
                    let child_path = format!("{}/{}", path, escape_pointer(key));
                    self.walk(child, &child_path);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(item, &format!("{}/{}", path, i));
                }
            }
            _ => {}
        }
    }

    fn check_reference(&mut self, reference: &str, path: &str) {
        match reference.strip_prefix('#') {
            Some(pointer) => {
                if self.doc.pointer(pointer).is_none() {
                    self.push(
                        Severity::Error,
                        "E002",
                        format!("{}/$ref", path),
                        format!("reference not found: {}", reference),
                    );
                }
            }
            None => self.push(
                Severity::Warning,
                "W004",
                format!("{}/$ref", path),
                format!("external reference is not resolved: {}", reference),
            ),
        }
    }

    /// Report every named schema that can reach itself through references.
    fn check_cycles(&mut self) {
        let doc = self.doc;
        let (base, defs) = match doc.pointer("/components/schemas") {
            Some(defs) => ("/components/schemas", defs),
            None => match doc.get("definitions") {
                Some(defs) => ("/definitions", defs),
                None => return,
            },
        };
        let Some(defs) = defs.as_object() else {
            return;
        };

        let graph: HashMap<&str, Vec<String>> = defs
            .iter()
            .map(|(name, def)| {
                let mut targets = Vec::new();
                collect_schema_refs(def, &mut targets);
                (name.as_str(), targets)
            })
            .collect();

        for name in defs.keys() {
            if let Some(cycle) = find_cycle(&graph, name) {
                self.push(
                    Severity::Warning,
                    "W002",
                    format!("{}/{}", base, escape_pointer(name)),
                    format!("schema participates in a reference cycle: {}", cycle.join(" -> ")),
                );
            }
        }
    }

    fn check_path_parameters(&mut self) {
        let doc = self.doc;
        let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
            return;
        };

        for (template, item) in paths {
            let shared = declared_path_params(doc, item.get("parameters"));
            for method in Method::ALL {
                let Some(op) = item.get(&method.path_item_key()) else {
                    continue;
                };
                let own = declared_path_params(doc, op.get("parameters"));
                for placeholder in path_placeholders(template) {
                    if !shared.contains(placeholder) && !own.contains(placeholder) {
                        self.push(
                            Severity::Warning,
                            "W003",
                            format!(
                                "/paths/{}/{}",
                                escape_pointer(template),
                                method.path_item_key()
                            ),
                            format!("path placeholder {{{}}} has no path parameter", placeholder),
                        );
                    }
                }
            }
        }
    }
}

/// Names of `in: path` parameters, following local `$ref`s.
fn declared_path_params<'a>(doc: &'a Value, params: Option<&'a Value>) -> HashSet<&'a str> {
    params
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|param| {
            let param = match param.get("$ref").and_then(Value::as_str) {
                Some(reference) => doc.pointer(reference.strip_prefix('#')?)?,
                None => param,
            };
            if param.get("in").and_then(Value::as_str) == Some("path") {
                param.get("name").and_then(Value::as_str)
            } else {
                None
            }
        })
        .collect()
}

/// Collect the names of named-schema references inside a schema.
fn collect_schema_refs(value: &Value, targets: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                if let Some(name) = REFERENCE_PREFIXES
                    .iter()
                    .find_map(|prefix| reference.strip_prefix(prefix))
                {
                    targets.push(name.replace("~1", "/").replace("~0", "~"));
                }
            }
            for child in map.values() {
                collect_schema_refs(child, targets);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_schema_refs(item, targets);
            }
        }
        _ => {}
    }
}

/// Shortest reference path from `start` back to itself, if any.
fn find_cycle(graph: &HashMap<&str, Vec<String>>, start: &str) -> Option<Vec<String>> {
    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in graph.get(node).into_iter().flatten() {
            let next = next.as_str();
            if next == start {
                let mut cycle = vec![start.to_string()];
                let mut current = node;
                while current != start {
                    cycle.push(current.to_string());
                    current = parents[current];
                }
                cycle.push(start.to_string());
                cycle.reverse();
                return Some(cycle);
            }
            if graph.contains_key(next) && !parents.contains_key(next) {
                parents.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Escape a key for use in a JSON Pointer (~ becomes ~0, / becomes ~1).
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Collect all document files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if has_document_extension(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOCUMENT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if has_document_extension(&path) {
            files.push(path);
        }
    }
}
