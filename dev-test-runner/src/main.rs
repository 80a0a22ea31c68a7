//! Runs declarative decode cases from `fixtures/cases/*.json`.
//!
//! ```text
//! cargo run -p dev-test-runner -- [CASE_DIR] [NAME_REGEX]
//! ```
//!
//! Each case names a schema (a path relative to the case file, or an inline
//! definition), a root struct, an input document and the expected outcome:
//! `"ok"`, `{"error": "<exact message>"}` or `{"error_matches": "<regex>"}`.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use json_thrift::{DecodeOptions, Decoder, Schema, SchemaDefinition};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    #[serde(default)]
    description: String,
    schema: SchemaRef,
    root: String,
    #[serde(default)]
    options: CaseOptions,
    input: Value,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemaRef {
    Path(PathBuf),
    Inline(SchemaDefinition),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseOptions {
    max_depth: Option<usize>,
    #[serde(default)]
    null_as_absent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expect {
    Ok,
    Error(String),
    ErrorMatches(String),
}

// ————————————————————————————————————————————————————————————————————————————
// RUN
// ————————————————————————————————————————————————————————————————————————————

fn main() {
    let mut args = std::env::args().skip(1);
    let case_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/cases"));
    let filter = match args.next().map(|src| Regex::new(&src)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid name filter: {error}");
            std::process::exit(2);
        }
    };

    let cases = match collect_cases(&case_dir, filter.as_ref()) {
        Ok(cases) => cases,
        Err(error) => {
            eprintln!("{error:#}");
            std::process::exit(2);
        }
    };

    let mut failed = 0;
    for path in &cases {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        match run_case(path) {
            Ok(description) => eprintln!("✅ {name} {description}"),
            Err(error) => {
                failed += 1;
                eprintln!("❌ {name}: {error:#}");
            }
        }
    }

    eprintln!("{} passed, {failed} failed", cases.len() - failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn collect_cases(dir: &Path, filter: Option<&Regex>) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            if filter.is_none_or(|rx| rx.is_match(&stem)) {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn run_case(path: &Path) -> Result<String> {
    let src = std::fs::read_to_string(path)?;
    let case: Case = from_str_with_path(&src)?;

    let schema = match &case.schema {
        SchemaRef::Path(rel) => {
            let base = path.parent().unwrap_or(Path::new("."));
            Schema::from_path(base.join(rel))?
        }
        SchemaRef::Inline(definition) => Schema::from_definition(definition)?,
    };
    let defaults = DecodeOptions::default();
    let options = DecodeOptions {
        max_depth: case.options.max_depth.unwrap_or(defaults.max_depth),
        null_as_absent: case.options.null_as_absent,
    };

    let result = Decoder::with_options(&schema, options).decode_value(&case.input, &case.root);
    match (&case.expect, result) {
        (Expect::Ok, Ok(_)) => {}
        (Expect::Ok, Err(error)) => bail!("expected success, got: {error}"),
        (Expect::Error(expected), Err(error)) if error.to_string() == *expected => {}
        (Expect::ErrorMatches(pattern), Err(error)) => {
            let rx = Regex::new(pattern)?;
            if !rx.is_match(&error.to_string()) {
                bail!("error `{error}` does not match /{pattern}/");
            }
        }
        (Expect::Error(expected), Err(error)) => bail!("expected error `{expected}`, got `{error}`"),
        (_, Ok(record)) => bail!("expected an error, decoded {record:?}"),
    }
    Ok(case.description)
}

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}
