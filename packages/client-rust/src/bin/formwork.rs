//! `formwork` command line: builds form models and sanitizes payloads from
//! local schema files, or creates and updates documents through the API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use formwork_client::cli::{Cli, Cmd, ModelArgs, RemoteArgs, ValidateArgs};
use formwork_client::{ClientConfig, DocumentClient, DocumentService};
use formwork_core::{
    build_model, validate_submitted_value, BuildRequest, FormConfig, MemoryStore, ReferenceData,
    Schema, SubmitOptions, Value,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_schema(path: &Path) -> Result<Schema> {
    match Schema::from_json(&read_json(path)?) {
        Some(schema) => Ok(schema),
        None => bail!("{} is not a schema object", path.display()),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn model_request(args: &ModelArgs) -> Result<BuildRequest> {
    let mut request = BuildRequest::new(read_schema(&args.schema)?).use_initial_data(args.initial);
    if let Some(path) = &args.data {
        let data = Value::from(read_json(path)?);
        request = if args.initial {
            request.initial_data(data)
        } else {
            request.form_data(data)
        };
    }
    if let Some(path) = &args.config {
        let config: FormConfig = serde_json::from_value(read_json(path)?)
            .with_context(|| format!("invalid form config {}", path.display()))?;
        request = request.config(config);
    }
    if let Some(path) = &args.reference {
        request = request.reference_data(ReferenceData::from_json(&read_json(path)?));
    }
    Ok(request)
}

fn model(args: &ModelArgs) -> Result<()> {
    let built = build_model(&model_request(args)?);
    print_json(&serde_json::json!({ "model": built.model, "data": built.data }))
}

fn fields(args: &ModelArgs) -> Result<()> {
    let built = build_model(&model_request(args)?);
    print_json(&built.form.fields)
}

fn validate(args: &ValidateArgs) -> Result<()> {
    let schema = read_schema(&args.schema)?;
    let data = Value::from(read_json(&args.data)?);
    let options = SubmitOptions {
        is_cloned: args.cloned,
        is_new: args.new,
        id_field: args.id_field.clone(),
    };
    print_json(&validate_submitted_value(&data, &schema, &options))
}

async fn remote(args: &RemoteArgs, create: bool) -> Result<()> {
    let config = ClientConfig {
        request_timeout: Duration::from_secs(args.timeout),
        ..ClientConfig::with_base_url(&args.url)
    };
    let store = Arc::new(MemoryStore::new());
    store.register_schema(&args.doc_type, read_schema(&args.schema)?);
    let service = DocumentService::new(DocumentClient::new(config)?, store);

    let Value::Map(mut data) = Value::from(read_json(&args.data)?) else {
        bail!("{} is not a JSON object", args.data.display());
    };
    if let Some(id) = &args.id {
        data.insert("_id".to_string(), Value::from(id.as_str()));
    }

    let stored = if create {
        service.create(&args.doc_type, &data).await
    } else {
        service.update(&args.doc_type, &data).await
    }
    .with_context(|| format!("saving {} document", args.doc_type))?;
    print_json(&stored)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.cmd {
        Cmd::Model(args) => model(args),
        Cmd::Fields(args) => fields(args),
        Cmd::Validate(args) => validate(args),
        Cmd::Create(args) => remote(args, true).await,
        Cmd::Update(args) => remote(args, false).await,
    }
}
