//! Minimal CLI: decode | check | schema
use std::borrow::Cow;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use crate::descriptor::Descriptor;
use crate::registry::Registry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate repository JSON against registry shapes, decode it, or print the schema
#[derive(Parser, Debug)]
#[command(name = "repo-shape")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every document and print the typed view (or re-encode it)
    Decode(DecodeOut),
    /// validate every document and report one line per document
    Check(CheckOut),
    /// print the JSON-schema-ish view of a registry type
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document (e.g. '.[]' to split a listing)
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// registry type every document must match
    #[arg(long = "type", default_value = crate::repo::REPO)]
    type_name: String,

    /// JSON registry file to use instead of the built-in repository shapes
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    type_settings: TypeSettings,

    /// encode the decoded value back to external names before printing
    #[arg(long, default_value_t = false)]
    encode: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    type_settings: TypeSettings,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// print the registry's own descriptor JSON instead
    #[arg(long, default_value_t = false)]
    raw: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document and where it came from.
#[derive(Debug, Clone)]
struct Document {
    origin: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let origin = source_path.to_string_lossy().to_string();
            tracing::debug!(%origin, "reading input");
            let source = read_source(&source_path)?;
            if self.ndjson {
                for (ix, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let origin = format!("{origin}:{}", ix + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("Failed to parse JSON line ({origin})"))?;
                    self.select(origin, value, &mut out)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("Failed to parse JSON source file ({origin})"))?;
                self.select(origin, value, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Apply the JSON pointer, then the jq filter.
    fn select(&self, origin: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(ptr) => match value.pointer(ptr) {
                Some(v) => v.clone(),
                None => bail!("JSON pointer {ptr} selects nothing in {origin}"),
            },
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { origin, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value).with_context(|| {
                    format!("Failed to apply jq expression to source file ({origin})")
                })?;
                for (ix, value) in results.into_iter().enumerate() {
                    out.push(Document { origin: format!("{origin}#{ix}"), value });
                }
            }
        }
        Ok(())
    }
}

impl TypeSettings {
    fn load_registry(&self) -> Result<Cow<'static, Registry>> {
        match self.registry.as_ref() {
            None => Ok(Cow::Borrowed(crate::repo::registry())),
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read registry file {}", path.display()))?;
                let registry = Registry::from_json_str(&src)
                    .with_context(|| format!("Invalid registry file {}", path.display()))?;
                tracing::info!(path = %path.display(), types = registry.len(), "loaded registry");
                Ok(Cow::Owned(registry))
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Decode(target) => {
                let registry = target.type_settings.load_registry()?;
                let typ = Descriptor::reference(target.type_settings.type_name.as_str());
                let docs = target.input_settings.load_documents()?;

                let mut outputs = Vec::with_capacity(docs.len());
                for doc in &docs {
                    let typed = registry
                        .cast(&doc.value, &typ)
                        .with_context(|| format!("{} does not decode", doc.origin))?;
                    let value = if target.encode {
                        registry
                            .uncast(&typed, &typ)
                            .with_context(|| format!("{} does not encode", doc.origin))?
                    } else {
                        typed.to_json()
                    };
                    outputs.push(value);
                }
                tracing::info!(documents = outputs.len(), "decoded");

                let output = match outputs.len() {
                    1 => outputs.remove(0),
                    _ => Value::Array(outputs),
                };
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&output)?)
            }
            Command::Check(target) => {
                let registry = target.type_settings.load_registry()?;
                let typ = Descriptor::reference(target.type_settings.type_name.as_str());
                let docs = target.input_settings.load_documents()?;

                let results = docs
                    .par_iter()
                    .map(|doc| registry.cast(&doc.value, &typ).map(|_| ()))
                    .collect::<Vec<_>>();

                let mut failed = 0usize;
                for (doc, result) in docs.iter().zip(results) {
                    match result {
                        Ok(()) => println!("{} {}", "✅".green(), doc.origin),
                        Err(error) => {
                            failed += 1;
                            tracing::warn!(origin = %doc.origin, %error, "validation failed");
                            println!("{} {}: {}", "❌".red(), doc.origin, error.to_string().red());
                        }
                    }
                }
                tracing::info!(documents = docs.len(), failed, "checked");
                if failed > 0 {
                    bail!("{failed} of {} documents failed validation", docs.len());
                }
                Ok(())
            }
            Command::Schema(target) => {
                let registry = target.type_settings.load_registry()?;
                let schema = if target.raw {
                    serde_json::to_value(registry.as_ref())?
                } else {
                    crate::schema::emit_schema(&registry, &target.type_settings.type_name)?
                };
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&schema)?)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

const STDIN: &str = "-";

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new(STDIN) {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file {}", path.display()))
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), "wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            // Literal path, or '-' for stdin
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
