//! `cairn` – checks and normalizes DSL requests.
//!
//! Reads a request from a file (or stdin), validates it against the bundled
//! catalog or a given schema document, parses it and prints its canonical
//! form together with the depth reached and the full-text flag.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cairn::config::Limits;
use cairn::schema::Schema;
use cairn::validator::Validator;
use cairn::{CairnError, RequestKind, RequestParser, Result, catalog};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Select,
    Insert,
    Update,
    Delete,
}

impl From<Kind> for RequestKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Select => RequestKind::Select,
            Kind::Insert => RequestKind::Insert,
            Kind::Update => RequestKind::Update,
            Kind::Delete => RequestKind::Delete,
        }
    }
}

#[derive(Parser)]
#[command(name = "cairn", version, about = "Validate and normalize DSL requests")]
struct Cli {
    /// Request file, stdin when absent
    request: Option<PathBuf>,

    /// Request kind, detected from the envelope when absent
    #[arg(short, long, value_enum)]
    kind: Option<Kind>,

    /// Schema document to validate against instead of the bundled catalog
    #[arg(short, long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Root type of the schema document
    #[arg(long, value_name = "TYPE")]
    root: Option<String>,

    /// Skip structural validation
    #[arg(long)]
    no_validate: bool,

    /// Configuration file with the parser limits
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
}

fn read_request(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn validate(cli: &Cli, kind: RequestKind, request: &Value) -> Result<()> {
    match &cli.schema {
        Some(path) => {
            let schema = Schema::parse(&fs::read_to_string(path)?)?;
            let root = cli.root.as_deref().unwrap_or(catalog::root_type(kind));
            Validator::new(&schema).validate(root, request)
        }
        None => catalog::validate_request(kind, request),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let limits = Limits::load(cli.config.as_deref())?;
    let mut parser = RequestParser::new(limits);
    let text = read_request(cli.request.as_ref())?;
    parser.sanity_check_request(text.len())?;
    let value: Value = serde_json::from_str(&text)?;
    let kind = match cli.kind {
        Some(kind) => kind.into(),
        None if value.is_array() => {
            return Err(CairnError::parse("the array form needs --kind"));
        }
        None => RequestKind::detect(&value),
    };
    let envelope = match value {
        Value::Array(parts) => Value::Object(RequestParser::from_array_form(kind, &parts)?),
        other => other,
    };
    if !cli.no_validate {
        validate(cli, kind, &envelope)?;
    }
    let request = parser.parse_value(kind, &envelope)?;
    info!(%kind, queries = request.queries().len(), "request accepted");
    println!("{}", request.canonical());
    println!("last depth: {}", parser.last_depth());
    println!("full text: {}", parser.has_full_text_query());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        warn!(error = %e, "request rejected");
        eprintln!("{e}");
        process::exit(1);
    }
}
