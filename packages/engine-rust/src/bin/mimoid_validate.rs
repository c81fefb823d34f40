//! `mimoid-validate`: checks a store snapshot against a schema declaration.
//!
//! Writes the `ValidationResult` as JSON to stdout and logs to stderr.
//! Exit codes: 0 conformant, 1 not conformant, 2 fatal error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mimoid_core::{DatabaseSchema, ValidationResult, ValidatorRegistry};
use mimoid_engine::{CancellationToken, Engine, EngineConfig, MemoryStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_NOT_CONFORMANT: u8 = 1;
const EXIT_FATAL: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "mimoid-validate",
    version,
    about = "Validate a document store snapshot against a declared schema"
)]
struct Args {
    /// Schema declaration (JSON).
    #[arg(long, env = "MIMOID_SCHEMA")]
    schema: PathBuf,

    /// Store snapshot (JSON) with documents and live index catalogs.
    #[arg(long, env = "MIMOID_STORE")]
    store: PathBuf,

    /// Documents sampled per collection.
    #[arg(long, env = "MIMOID_SAMPLE_SIZE", default_value_t = 10)]
    sample_size: usize,

    /// Collections validated concurrently.
    #[arg(long, env = "MIMOID_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Abort the run after this many milliseconds.
    #[arg(long, env = "MIMOID_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Pretty-print the result document.
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_sample_size(self.sample_size)
            .with_concurrency(self.concurrency);
        match self.timeout_ms {
            Some(ms) => config.with_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_schema(path: &Path) -> anyhow::Result<DatabaseSchema> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    DatabaseSchema::from_json_str(&raw).with_context(|| format!("parsing schema {}", path.display()))
}

fn load_store(path: &Path, seed: Option<u64>) -> anyhow::Result<MemoryStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading store snapshot {}", path.display()))?;
    MemoryStore::from_json_str(&raw, seed)
        .with_context(|| format!("parsing store snapshot {}", path.display()))
}

fn load_inputs(args: &Args) -> anyhow::Result<(DatabaseSchema, ValidatorRegistry, MemoryStore)> {
    let schema = load_schema(&args.schema)?;
    let registry =
        ValidatorRegistry::from_schema(&schema).context("compiling collection shapes")?;
    let store = load_store(&args.store, args.seed)?;
    Ok((schema, registry, store))
}

fn render(result: &ValidationResult, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_json);

    let (schema, registry, store) = match load_inputs(&args) {
        Ok(inputs) => inputs,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to load inputs");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let engine = Engine::new(args.engine_config());
    let result = match engine
        .validate_with_cancel(&schema, &registry, &store, &cancel)
        .await
    {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "validation aborted");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match render(&result, args.pretty) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            error!(error = %err, "failed to serialise result");
            return ExitCode::from(EXIT_FATAL);
        }
    }

    let summary = result.validation_summary;
    info!(
        collections = summary.total_collections,
        errors = summary.total_validation_errors,
        success = summary.overall_success,
        "validation finished"
    );
    if summary.overall_success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NOT_CONFORMANT)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(schema: &Path, store: &Path) -> Args {
        Args::parse_from([
            "mimoid-validate",
            "--schema",
            schema.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "--sample-size",
            "3",
            "--seed",
            "9",
        ])
    }

    const SCHEMA: &str = r#"{
        "database_name": "shop",
        "collections": {
            "users": {
                "indexes": [{"name": "email_unique", "keys": [["email", 1]], "unique": true}],
                "shape": {"bsonType": "object", "required": ["email"]}
            }
        }
    }"#;

    const STORE: &str = r#"{
        "collections": {
            "users": {
                "documents": [{"_id": "u1", "email": "a@x.io"}, {"_id": "u2"}],
                "indexes": [
                    {"name": "_id_", "keys": [["_id", 1]]},
                    {"name": "email_unique", "keys": [["email", 1]], "unique": true}
                ]
            }
        }
    }"#;

    #[test]
    fn flags_map_onto_engine_config() {
        let parsed = Args::parse_from([
            "mimoid-validate",
            "--schema",
            "s.json",
            "--store",
            "d.json",
            "--concurrency",
            "2",
            "--timeout-ms",
            "1500",
        ]);
        let config = parsed.engine_config();
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.concurrency(), 2);
        assert_eq!(config.run_timeout, Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn loads_files_and_reports_shape_failures() {
        let schema = write_temp(SCHEMA);
        let store = write_temp(STORE);
        let args = args(schema.path(), store.path());
        let (schema, registry, store) = load_inputs(&args).unwrap();
        assert!(registry.contains("users"));

        let result = Engine::new(args.engine_config())
            .validate(&schema, &registry, &store)
            .await
            .unwrap();
        let users = result.collection("users").unwrap();
        assert_eq!(users.documents_sampled, 2);
        assert_eq!(users.schema_validation.invalid_documents, 1);
        assert!(users.index_validation.passed);
        assert!(!result.is_success());

        let json = render(&result, false).unwrap();
        assert!(json.contains("\"validation_summary\""));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let store = write_temp(STORE);
        let args = args(Path::new("/nonexistent/schema.json"), store.path());
        let err = load_inputs(&args).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/schema.json"));
    }

    #[test]
    fn malformed_schema_is_rejected() {
        let schema = write_temp("{\"database_name\": 3}");
        let store = write_temp(STORE);
        let err = load_inputs(&args(schema.path(), store.path())).err().unwrap();
        assert!(format!("{err:#}").contains("parsing schema"));
    }
}
