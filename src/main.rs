use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use odoo_relay::config::{API_KEY_ENV, ENDPOINT_ENV};
use odoo_relay::http::ReqwestTransport;
use odoo_relay::rpc::{OdooAction, OdooRequest, TargetInstance};
use odoo_relay::{ConnectionSettings, Dispatcher};
use serde_json::{Map, Value};

/// odoo-relay - Odoo proxy client
///
/// Forwards a single call to an Odoo JSON-RPC proxy and prints the returned
/// envelope. Exits with status 2 when Odoo reports an error in the envelope.
///
/// Examples:
///   odoo-relay call search_count res.partner --db prod --user-id 2
///   odoo-relay send request.json
#[derive(Parser, Debug)]
#[command(author, version = env!("ODOO_RELAY_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Proxy endpoint root, e.g. https://proxy.example.com
    #[arg(long, env = ENDPOINT_ENV, value_name = "URL", global = true)]
    endpoint: Option<String>,

    /// Proxy API key, sent in the `apikey` header
    #[arg(long, env = API_KEY_ENV, value_name = "KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Forward a request read from a JSON file
    Send(SendArgs),

    /// Build a request from flags and forward it
    Call(CallArgs),
}

#[derive(clap::Args, Debug)]
struct SendArgs {
    /// Path to a JSON file holding the full request
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    /// Action to perform (search_count, search, read, fields_get, search_read,
    /// create, write, unlink, call_method)
    #[arg(value_name = "ACTION")]
    action: OdooAction,

    /// Odoo model, e.g. res.partner
    #[arg(value_name = "MODEL")]
    model: String,

    /// Request id echoed back in the envelope
    #[arg(long, default_value = "odoo-relay")]
    id: String,

    /// Keyword arguments as a JSON object
    #[arg(long, value_name = "JSON", value_parser = parse_kwargs)]
    kwargs: Option<Map<String, Value>>,

    /// Positional arguments as a JSON array
    #[arg(long, value_name = "JSON", value_parser = parse_args)]
    args: Option<Value>,

    /// Method name, for the call_method action
    #[arg(long)]
    method: Option<String>,

    #[command(flatten)]
    instance: InstanceArgs,
}

#[derive(clap::Args, Debug)]
struct InstanceArgs {
    /// URL of the target Odoo instance
    #[arg(long = "instance-url", env = "ODOO_INSTANCE_URL", value_name = "URL")]
    url: String,

    /// Database of the target Odoo instance
    #[arg(long, env = "ODOO_INSTANCE_DB")]
    db: String,

    /// Odoo user id
    #[arg(long, env = "ODOO_INSTANCE_USER_ID")]
    user_id: i64,

    /// Odoo API key of that user
    #[arg(
        id = "instance_key",
        long = "instance-key",
        env = "ODOO_INSTANCE_API_KEY",
        value_name = "KEY",
        hide_env_values = true
    )]
    api_key: String,
}

impl From<InstanceArgs> for TargetInstance {
    fn from(args: InstanceArgs) -> Self {
        TargetInstance {
            url: args.url,
            db: args.db,
            user_id: args.user_id,
            api_key: args.api_key,
        }
    }
}

fn parse_kwargs(s: &str) -> Result<Map<String, Value>, String> {
    serde_json::from_str(s).map_err(|e| format!("expected a JSON object: {}", e))
}

// Kept as a `Value`: clap would treat a `Vec` field as a repeated flag.
fn parse_args(s: &str) -> Result<Value, String> {
    match serde_json::from_str(s) {
        Ok(Value::Array(items)) => Ok(Value::Array(items)),
        Ok(_) => Err("expected a JSON array".to_string()),
        Err(e) => Err(format!("expected a JSON array: {}", e)),
    }
}

fn read_request(path: &Path) -> Result<OdooRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid request in {}", path.display()))
}

fn build_request(args: CallArgs) -> OdooRequest {
    let mut request = OdooRequest::new(args.id, args.action, args.model, args.instance.into());
    request.kwargs = args.kwargs;
    request.args = match args.args {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };
    request.method = args.method;
    request
}

fn build_dispatcher(cli: &Cli) -> Result<Dispatcher> {
    let settings = ConnectionSettings::new(
        cli.endpoint.clone().unwrap_or_default(),
        cli.api_key.clone().unwrap_or_default(),
    )
    .with_context(|| format!("Set --endpoint/{} and --api-key/{}", ENDPOINT_ENV, API_KEY_ENV))?;

    let transport = ReqwestTransport::with_timeout(cli.timeout.map(Duration::from_secs))?;
    Ok(Dispatcher::new(settings, Some(Arc::new(transport)))?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let dispatcher = build_dispatcher(&cli)?;

    let request = match cli.command {
        Commands::Send(args) => read_request(&args.file)?,
        Commands::Call(args) => build_request(args),
    };
    debug!("Request: {:?}", request);

    let envelope = dispatcher
        .forward(&request)
        .await
        .with_context(|| format!("Failed to forward request {}", request.id))?;

    println!("{}", serde_json::to_string_pretty(envelope.raw())?);

    match &envelope.error {
        Some(error) => {
            eprintln!("{}", error);
            Ok(ExitCode::from(2))
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
