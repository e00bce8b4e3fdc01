use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hermes - schema-driven receiver, sender and interface documentation
#[derive(Parser, Debug, Clone)]
#[command(name = "hermes", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "HERMES_CONFIG", default_value = "hermes.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the mock receiver that validates inbound payloads
    Receive(ServerArgs),

    /// Run the sender service (body generation and dispatch over HTTP)
    Sender(SenderArgs),

    /// Synthesize a body for one sender endpoint and dispatch it once
    Send {
        /// Index of the endpoint in the sender configuration
        #[arg(short, long)]
        endpoint: usize,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Render the interface document for two OpenAPI documents
    Translate(TranslateArgs),

    /// Convert a JSON document to YAML, keeping key order
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Server host address
    #[arg(long, env = "HERMES_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "HERMES_PORT")]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Host the sender dispatches to
    #[arg(long, env = "HERMES_TARGET_HOST")]
    pub target_host: Option<String>,

    /// Port the sender dispatches to
    #[arg(long, env = "HERMES_TARGET_PORT")]
    pub target_port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SenderArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TranslateArgs {
    /// Name of the system described by the internal OpenAPI document
    #[arg(long)]
    pub internal: String,

    /// Name of the system described by the external OpenAPI document
    #[arg(long)]
    pub external: String,

    /// OpenAPI document of the internal system (JSON or YAML)
    #[arg(long)]
    pub internal_spec: PathBuf,

    /// OpenAPI document of the external system (JSON or YAML)
    #[arg(long)]
    pub external_spec: PathBuf,

    /// Output file, defaults to `{external}-{internal}-Interface.md`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
