//! Minimal CLI: check | decode | schema
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::decode::{DEFAULT_MAX_DEPTH, DecodeOptions, Decoder};
use crate::input::{InputOptions, load_documents};
use crate::schema::Schema;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode schema-less JSON against a Thrift-shaped schema definition
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate every input document, one line per document
    Check(CheckOut),
    /// decode every input document and print the records
    Decode(DecodeOut),
    /// print the normalized schema
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema definition file (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// struct to decode each document as
    #[arg(long, short)]
    root: String,
}

#[derive(Args, Debug, Clone)]
struct DecodeSettings {
    /// deepest struct/container nesting accepted
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// treat `"field": null` as an absent field
    #[arg(long, default_value_t = false)]
    null_as_absent: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq pre-process filter for each document
    #[arg(long)]
    jq_expr: Option<String>,

    /// one or more inputs: literal paths, quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only print failing documents
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    /// schema definition file (JSON)
    #[arg(long, short)]
    schema: PathBuf,
}

// ————————————————————————————————————————————————————————————————————————————
// SETTINGS
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<Schema> {
        let schema = Schema::from_path(&self.schema)
            .with_context(|| format!("failed to load schema {}", self.schema.display()))?;
        if schema.get(&self.root).is_none() {
            bail!("struct {} is not defined in {}", self.root, self.schema.display());
        }
        Ok(schema)
    }
}

impl DecodeSettings {
    fn options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            null_as_absent: self.null_as_absent,
        }
    }
}

impl InputSettings {
    fn options(&self) -> InputOptions {
        InputOptions {
            ndjson: self.ndjson,
            json_pointer: self.json_pointer.clone(),
            jq_expr: self.jq_expr.clone(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RUN
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Decode(target) => target.run(),
            Command::Schema(target) => {
                let schema = Schema::from_path(&target.schema)
                    .with_context(|| format!("failed to load schema {}", target.schema.display()))?;
                print!("{schema}");
                Ok(())
            }
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<()> {
        let schema = self.schema_settings.load()?;
        let decoder = Decoder::with_options(&schema, self.decode_settings.options());
        let documents = load_documents(&self.input_settings.input, &self.input_settings.options())?;
        let root = self.schema_settings.root.as_str();

        // decoding is independent per document
        let results: Vec<_> = documents
            .par_iter()
            .map(|doc| decoder.decode_value(&doc.value, root).map(|_| ()))
            .collect();

        let mut failed = 0usize;
        for (doc, result) in documents.iter().zip(&results) {
            match result {
                Ok(()) => {
                    if !self.quiet {
                        println!("{} {}", "✓".green(), doc.source);
                    }
                }
                Err(error) => {
                    failed += 1;
                    println!("{} {}: {error}", "✗".red(), doc.source.as_str().bold());
                }
            }
        }

        if failed > 0 {
            bail!("{failed} of {} documents do not match {root}", documents.len());
        }
        eprintln!("{} documents match {root}", documents.len());
        Ok(())
    }
}

impl DecodeOut {
    fn run(&self) -> Result<()> {
        let schema = self.schema_settings.load()?;
        let decoder = Decoder::with_options(&schema, self.decode_settings.options());
        let documents = load_documents(&self.input_settings.input, &self.input_settings.options())?;
        let root = self.schema_settings.root.as_str();

        let mut rendered = String::new();
        for doc in &documents {
            let record = decoder
                .decode_value(&doc.value, root)
                .with_context(|| format!("failed to decode {}", doc.source))?;
            rendered.push_str(&format!("// {}\n{record:#?}\n", doc.source));
        }

        if let Some(out) = self.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, &rendered).with_context(|| format!("failed to write {}", out.display()))?;
        } else {
            print!("{rendered}");
        }
        Ok(())
    }
}
