use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "mesh-cli")]
#[command(about = "Inspect circuit breakers and rate limiters of a running mesh-gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "MESH_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway version, uptime and open circuits
    Status,
    /// Breaker and limiter state of every target, or of one
    Targets {
        /// Show a single target
        name: Option<String>,
    },
    /// Readiness (fails while any circuit is open)
    Ready,
    /// Liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (path, authenticated) = match &cli.command {
        Commands::Status => ("/admin/status".to_string(), true),
        Commands::Targets { name: Some(name) } => (format!("/admin/targets/{name}"), true),
        Commands::Targets { name: None } => ("/admin/targets".to_string(), true),
        Commands::Ready => ("/ready".to_string(), false),
        Commands::Health => ("/health".to_string(), false),
    };

    let mut request = client.get(format!("{}{}", cli.url.trim_end_matches('/'), path));
    if authenticated {
        request = request.headers(headers);
    }
    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // /ready carries the snapshot on 503 too.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !text.is_empty() => println!("{text}"),
        Err(_) => {}
    }

    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        std::process::exit(1);
    }
    Ok(())
}
