use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use registry_gateway::Document;
use registry_gateway::GatewayError;
use registry_gateway::SubmissionGateway;
use tracing_subscriber::EnvFilter;

/// Submit one document to the registry, never faster than `--rate` per second.
///
/// Exit codes: 0 success, 1 usage error or unreadable document, 2 invalid
/// configuration, 3 serialization error, 4 transport failure, 5 non-OK
/// response, 6 timeout.
#[derive(Debug, Parser)]
#[command(name = "registry-submit", version)]
struct Args {
    /// Registry base URL. Documents go to <BASE_URL>/api/v3/lk/documents/create.
    #[arg(long, env = "REGISTRY_BASE_URL", default_value = "https://ismp.crpt.ru")]
    base_url: String,

    /// Maximum submissions per second.
    #[arg(long, env = "REGISTRY_RATE", default_value_t = 1.0, allow_negative_numbers = true)]
    rate: f64,

    /// Detached signature sent in the `Signature` header.
    #[arg(long, env = "REGISTRY_SIGNATURE")]
    signature: String,

    /// JSON document to submit. A placeholder document is sent when omitted.
    #[arg(long)]
    document: Option<PathBuf>,

    /// Give up if no permit and channel are available within this long (e.g. `2s`).
    #[arg(long, value_parser = humantime::parse_duration)]
    max_wait: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to read document {path:?}: {source}")]
    ReadDocument {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse document {path:?}: {source}")]
    ParseDocument {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::ReadDocument { .. } | Self::ParseDocument { .. } => 1,
            Self::Gateway(err) => err.exit_code(),
        }
    }
}

// clap would exit with 2 on bad flags, which is taken by invalid configuration.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

fn load_document(path: Option<&PathBuf>) -> Result<Document, CliError> {
    let Some(path) = path else {
        return Ok(Document::sample());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadDocument {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::ParseDocument {
        path: path.clone(),
        source,
    })
}

async fn run(args: Args) -> Result<String, CliError> {
    let mut gateway = SubmissionGateway::new(&args.base_url, args.rate)?;
    if let Some(max_wait) = args.max_wait {
        gateway = gateway.with_max_wait(max_wait);
    }

    let document = load_document(args.document.as_ref())?;
    tracing::info!(
        endpoint = %gateway.endpoint(),
        rate = args.rate,
        doc_id = %document.doc_id,
        "submitting document"
    );

    Ok(gateway.submit(&document, &args.signature).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };

    match run(args).await {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
