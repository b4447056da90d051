//! Minimal CLI: declarations → (schema | decode)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{Config, DeclarationFile, Namespace};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON/NDJSON documents into declared records, or print their resolved schemas
#[derive(Parser, Debug)]
#[command(name = "recast", version)]
pub struct CommandLineInterface {
    /// log filter used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve and print record schemas
    Schema(SchemaOut),
    /// decode documents against a record and print the canonical result
    Decode(DecodeOut),
}

#[derive(Args, Debug, Clone)]
struct DeclarationSettings {
    /// JSON declaration file: {"records": [{"name": .., "fields": [{"name": .., "type": ..}]}]}
    #[arg(long, short)]
    declarations: PathBuf,

    /// JSON engine config file (primitives, cache_schemas, max_depth)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is decoded.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    declarations: DeclarationSettings,

    /// only print this record (all records if omitted)
    #[arg(long)]
    record: Option<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    declarations: DeclarationSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// record every document is decoded into
    #[arg(long)]
    record: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One raw document plus where it came from, for status lines.
#[derive(Debug, Clone)]
pub struct Document {
    pub origin: String,
    pub value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl DeclarationSettings {
    fn load_namespace(&self) -> Result<Namespace> {
        let config = match self.config.as_ref() {
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Config::from_json_str(&src)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Config::default(),
        };
        let bytes = std::fs::read(&self.declarations).with_context(|| {
            format!("failed to read declarations {}", self.declarations.display())
        })?;
        let file = DeclarationFile::from_slice(&bytes)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid declarations {}", self.declarations.display()))?;
        debug!(records = file.records.len(), ?config, "loaded declarations");
        Ok(Namespace::from_declarations(config, file.records))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths =
            resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            let values = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| {
                        serde_json::from_str::<Value>(line).with_context(|| {
                            format!("failed to parse NDJSON line {} of {source_path_str}", i + 1)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                vec![serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file {source_path_str}"))?]
            };
            for (i, value) in values.into_iter().enumerate() {
                for (j, value) in self.select(value, &source_path_str)?.into_iter().enumerate() {
                    out.push(Document { origin: format!("{source_path_str}#{i}.{j}"), value });
                }
            }
        }
        info!(documents = out.len(), "loaded input documents");
        Ok(out)
    }

    /// Apply the JSON pointer, then the jq filter.
    fn select(&self, value: Value, origin: &str) -> Result<Vec<Value>> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(ptr) => match value.pointer(ptr) {
                Some(node) => node.clone(),
                None => bail!("JSON pointer {ptr} selects nothing in {origin}"),
            },
        };
        match self.jq_expr.as_deref() {
            None => Ok(vec![value]),
            Some(jq_expr) => crate::jq_exec::select_documents(jq_expr, &value).with_context(|| {
                format!("failed to apply jq expression to source file ({origin})")
            }),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        init_logging(&self.log_level);
        match &self.cmd {
            Command::Schema(target) => {
                let namespace = target.declarations.load_namespace()?;
                let names: Vec<String> = match target.record.as_ref() {
                    Some(name) => vec![name.clone()],
                    None => namespace.record_names().map(str::to_string).collect(),
                };
                let schemas = names
                    .iter()
                    .map(|name| schema_json(&namespace, name))
                    .collect::<crate::Result<Vec<_>>>()?;
                let schema_src = serde_json::to_string_pretty(&schemas)?;
                write_output(target.out.as_deref(), &schema_src)
            }
            Command::Decode(target) => {
                let namespace = target.declarations.load_namespace()?;
                // fail early on a bad declaration instead of once per document
                namespace.schema(&target.record)?;
                let documents = target.input_settings.load_documents()?;
                let results = decode_documents(&namespace, &target.record, &documents);

                let mut decoded = Vec::with_capacity(results.len());
                let mut failed = 0usize;
                for (doc, result) in documents.iter().zip(results) {
                    match result {
                        Ok(value) => {
                            eprintln!("{} {}", "✅ decoded".green(), doc.origin);
                            decoded.push(value);
                        }
                        Err(error) => {
                            eprintln!("{} {}: {error}", "❌ failed".red(), doc.origin);
                            failed += 1;
                        }
                    }
                }

                let out_src = if target.input_settings.ndjson {
                    decoded
                        .iter()
                        .map(serde_json::to_string)
                        .collect::<serde_json::Result<Vec<_>>>()?
                        .join("\n")
                } else {
                    serde_json::to_string_pretty(&decoded)?
                };
                write_output(target.out.as_deref(), &out_src)?;

                if failed > 0 {
                    bail!("{failed} of {} documents failed to decode", documents.len());
                }
                Ok(())
            }
        }
    }
}

/// Decode every document against `record` in parallel, in input order.
pub fn decode_documents(
    namespace: &Namespace,
    record: &str,
    documents: &[Document],
) -> Vec<crate::Result<Value>> {
    documents
        .par_iter()
        .map(|doc| {
            let instance = namespace.deserialize_record(record, &doc.value)?;
            crate::Data::Record(instance).to_value()
        })
        .collect()
}

pub fn schema_json(namespace: &Namespace, record: &str) -> crate::Result<Value> {
    let schema = namespace.schema(record)?;
    let fields = schema
        .fields
        .iter()
        .map(|f| json!({ "name": f.name, "type": f.ty.to_string() }))
        .collect::<Vec<_>>();
    Ok(json!({ "record": schema.record, "fields": fields }))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recast={default_level}")));
    // a subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
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
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Declaration;

    fn namespace() -> Namespace {
        Namespace::from_declarations(
            Config::default(),
            [
                Declaration::new("A").field("a", "int").field("b", "B"),
                Declaration::new("B").field("b", "int"),
            ],
        )
    }

    #[test]
    fn decode_keeps_input_order_and_reports_each_failure() {
        let documents = vec![
            Document { origin: "one".into(), value: json!({"a": 1, "b": {"b": 2}, "x": 0}) },
            Document { origin: "two".into(), value: json!({"a": 1}) },
            Document { origin: "three".into(), value: json!({"a": 3, "b": {"b": 4}}) },
        ];
        let results = decode_documents(&namespace(), "A", &documents);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &json!({"a": 1, "b": {"b": 2}}));
        assert!(matches!(results[1], Err(crate::Error::MissingField { .. })));
        assert_eq!(results[2].as_ref().unwrap(), &json!({"a": 3, "b": {"b": 4}}));
    }

    #[test]
    fn schema_json_uses_canonical_type_names() {
        let ns = Namespace::from_declarations(
            Config::default(),
            [Declaration::new("T").field("xs", "Vec<HashMap<String, f64>>")],
        );
        assert_eq!(
            schema_json(&ns, "T").unwrap(),
            json!({ "record": "T", "fields": [ { "name": "xs", "type": "Sequence[Mapping[Text, Float]]" } ] })
        );
    }

    #[test]
    fn pointer_then_jq_selection() {
        let settings = InputSettings {
            ndjson: false,
            json_pointer: Some("/data".into()),
            jq_expr: Some(".[]".into()),
            input: vec![],
        };
        let docs = settings.select(json!({"data": [{"a": 1}, {"a": 2}]}), "mem").unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": 2})]);

        let missing = settings.select(json!({"other": 1}), "mem").unwrap_err();
        assert!(missing.to_string().contains("/data"));
    }

    #[test]
    fn literal_paths_pass_through_and_empty_globs_fail() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    #[test]
    fn arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "recast", "decode", "-d", "decls.json", "--record", "A", "-i", "x.json", "y.json",
        ])
        .unwrap();
        let Command::Decode(target) = cli.cmd else {
            panic!("expected decode");
        };
        assert_eq!(target.record, "A");
        assert_eq!(target.input_settings.input, ["x.json", "y.json"]);
        assert_eq!(cli.log_level, "warn");
    }
}
