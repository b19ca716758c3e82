//! Command line surface of the `formwork` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "formwork", version, about = "Schema-driven form models and payload sanitizing")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Debug, Subcommand)]
pub enum Cmd {
    /// Build the form model and print descriptors plus data tree
    Model(ModelArgs),
    /// Print the flat field list of a form
    Fields(ModelArgs),
    /// Sanitize a payload against a schema
    Validate(ValidateArgs),
    /// Create a document through the API
    Create(RemoteArgs),
    /// Update a document through the API
    Update(RemoteArgs),
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Schema document (JSON object of field entries)
    #[arg(long)]
    pub schema: PathBuf,
    /// Document data to edit
    #[arg(long)]
    pub data: Option<PathBuf>,
    /// Treat `--data` as the document's initial data
    #[arg(long)]
    pub initial: bool,
    /// Form settings (widgets, numeric bounds, textarea threshold)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Reference collections, `{ "collection": [items] }`
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub schema: PathBuf,
    #[arg(long)]
    pub data: PathBuf,
    /// The document has never been saved
    #[arg(long)]
    pub new: bool,
    /// The document is a copy of an existing one
    #[arg(long)]
    pub cloned: bool,
    #[arg(long, default_value = "_id")]
    pub id_field: String,
}

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Document type, e.g. `event`
    #[arg(long = "type")]
    pub doc_type: String,
    #[arg(long)]
    pub schema: PathBuf,
    #[arg(long)]
    pub data: PathBuf,
    /// Identifier to update; overrides the one in `--data`
    #[arg(long)]
    pub id: Option<String>,
    /// API root
    #[arg(long, env = "FORMWORK_URL", default_value = "http://localhost:3000/api")]
    pub url: String,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}
