//! Input loading for the CLI: paths and globs, stdin, NDJSON, JSON-pointer
//! selection and jq pre-filtering.
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    /// One document per non-blank line.
    pub ndjson: bool,
    /// Select a subnode of each document, e.g. `/data/items/0/payload`.
    pub json_pointer: Option<String>,
    /// jq filter applied after pointer selection; each output is a document.
    pub jq_expr: Option<String>,
}

/// One JSON document plus a label saying where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: String,
    pub value: Value,
}

pub fn load_documents<I>(patterns: I, options: &InputOptions) -> Result<Vec<Document>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::new();
    for source in resolve_sources(patterns)? {
        let (label, text) = match &source {
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read stdin")?;
                ("<stdin>".to_string(), text)
            }
            Source::File(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read source file {}", path.display()))?;
                (path.display().to_string(), text)
            }
        };
        parse_documents(&label, &text, options, &mut out)?;
    }
    log::debug!("loaded {} documents", out.len());
    Ok(out)
}

fn parse_documents(label: &str, text: &str, options: &InputOptions, out: &mut Vec<Document>) -> Result<()> {
    let mut raw = Vec::new();
    if options.ndjson {
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let source = format!("{label}:{}", i + 1);
            let value = serde_json::from_str::<Value>(line)
                .with_context(|| format!("failed to parse JSON ({source})"))?;
            raw.push((source, value));
        }
    } else {
        let value = serde_json::from_str::<Value>(text)
            .with_context(|| format!("failed to parse JSON source file ({label})"))?;
        raw.push((label.to_string(), value));
    }

    for (source, value) in raw {
        let value = match options.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(selected) => selected.clone(),
                None => bail!("JSON pointer {pointer} selects nothing in {source}"),
            },
        };
        match options.jq_expr.as_deref() {
            None => out.push(Document { source, value }),
            Some(jq_expr) => {
                let results = crate::jq::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {source}"))?;
                for (k, value) in results.into_iter().enumerate() {
                    out.push(Document { source: format!("{source}[{k}]"), value });
                }
            }
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Stdin,
    File(PathBuf),
}

fn resolve_sources<I>(patterns: I) -> Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(Source::File(entry?));
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }
    Ok(out)
}
