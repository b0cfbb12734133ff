use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;

use flow_sdk::{DocumentId, FlowDb, SearchRequest, StreamDefinition};
use flow_server::FlowServer;

use crate::cli::*;
use crate::settings::Settings;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(settings, args),
        command => {
            if !settings.is_persistent() {
                bail!("no database file given; pass --data or set `storage` in --config");
            }
            let db = FlowDb::open(settings.flow)?;
            let result = run_local(&db, command, format);
            db.close()?;
            result
        }
    }
}

fn run_local(db: &FlowDb, command: Command, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Configure(args) => cmd_configure(db, args),
        Command::Streams => cmd_streams(db, format),
        Command::Schema(args) => print_value(&db.get_schema(&args.stream)?, format),
        Command::Append(args) => cmd_append(db, args, format),
        Command::Get(args) => {
            let raw = db.get_document(&args.stream, DocumentId::new(args.id))?;
            print_document(&raw, format)
        }
        Command::Recent(args) => {
            let docs = db.recent(&args.stream, args.order, args.limit)?;
            print_documents(&docs, format)
        }
        Command::Search(args) => {
            let mut request = SearchRequest::new(args.stream, args.query).sort(args.order);
            request.max_results = args.max_results;
            let docs = db.search(&request)?;
            print_documents(&docs, format)
        }
        Command::Serve(_) => bail!("`serve` does not run against a local database"),
    }
}

fn cmd_serve(settings: Settings, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = settings.server.clone();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(max) = args.max_body_bytes {
        config.max_body_bytes = max;
    }
    config.allow_any_origin |= args.cors;

    if !settings.is_persistent() {
        tracing::warn!("serving from memory; documents are lost on exit");
    }
    let db = FlowDb::open(settings.flow)?;
    println!("{} FlowDB listening on {}", "✓".green().bold(), config.bind_addr.to_string().bold());

    let runtime = tokio::runtime::Runtime::new().context("starting the async runtime")?;
    runtime.block_on(FlowServer::new(config, db).serve())?;
    Ok(())
}

/// Accepts `{"dataStreams": [...]}` or a bare array of stream definitions.
fn cmd_configure(db: &FlowDb, args: ConfigureArgs) -> anyhow::Result<()> {
    let value = read_json(&args.file.to_string_lossy())?;
    let streams = match value {
        Value::Object(mut body) => body.remove("dataStreams").unwrap_or(Value::Null),
        array => array,
    };
    let streams: Vec<StreamDefinition> =
        serde_json::from_value(streams).context("expected an array of {name, schema} objects")?;
    let count = streams.len();
    db.set_configuration(streams)?;
    println!("{} Configured {} stream(s)", "✓".green().bold(), count);
    Ok(())
}

fn cmd_streams(db: &FlowDb, format: OutputFormat) -> anyhow::Result<()> {
    let streams = db.current_configuration()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&streams)?),
        OutputFormat::Text if streams.is_empty() => println!("No streams configured."),
        OutputFormat::Text => {
            for stream in &streams {
                println!("  {}", stream.as_str().cyan());
            }
        }
    }
    Ok(())
}

fn cmd_append(db: &FlowDb, args: AppendArgs, format: OutputFormat) -> anyhow::Result<()> {
    let documents = match read_json(&args.input)? {
        Value::Array(documents) => documents,
        single => vec![single],
    };
    let ids = db.append_documents(&args.stream, documents)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({"ids": ids})),
        OutputFormat::Text => {
            println!(
                "{} Appended {} document(s) to {}",
                "✓".green().bold(),
                ids.len(),
                args.stream.cyan()
            );
            for id in &ids {
                println!("  {}", id.to_string().yellow());
            }
        }
    }
    Ok(())
}

/// Read JSON from a file, or from stdin when `input` is `-`.
fn read_json(input: &str) -> anyhow::Result<Value> {
    let text = if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        text
    } else {
        std::fs::read_to_string(Path::new(input)).with_context(|| format!("reading {input}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing JSON from {input}"))
}

fn print_value(value: &Value, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_document(raw: &[u8], format: OutputFormat) -> anyhow::Result<()> {
    let value: Value = serde_json::from_slice(raw).context("stored document is not JSON")?;
    print_value(&value, format)
}

fn print_documents(docs: &[Vec<u8>], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Text && docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    if format == OutputFormat::Json {
        let values = docs
            .iter()
            .map(|raw| serde_json::from_slice(raw))
            .collect::<Result<Vec<Value>, _>>()?;
        println!("{}", serde_json::to_string(&values)?);
        return Ok(());
    }
    for raw in docs {
        print_document(raw, format)?;
    }
    println!("{}", format!("{} document(s)", docs.len()).dimmed());
    Ok(())
}
