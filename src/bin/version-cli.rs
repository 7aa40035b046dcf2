use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "version-cli")]
#[command(about = "Management CLI for the version router admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status and snapshot generation
    Status,
    /// List groups and the lifecycle of their versions
    Versions,
    /// List route bindings
    Routes,
    /// Deprecate a version, optionally scheduling its sunset
    Deprecate {
        group: String,
        version: String,
        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        at: Option<String>,
        /// RFC 3339 timestamp after which the version answers 410
        #[arg(long)]
        sunset: Option<String>,
    },
    /// Clear the deprecation and sunset dates of a version
    Undeprecate { group: String, version: String },
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

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Versions => client.get(format!("{}/admin/versions", cli.url)),
        Commands::Routes => client.get(format!("{}/admin/routes", cli.url)),
        Commands::Deprecate {
            group,
            version,
            at,
            sunset,
        } => client
            .post(lifecycle_url(&cli.url, &group, &version))
            .json(&json!({ "deprecated_at": at, "sunset_at": sunset })),
        Commands::Undeprecate { group, version } => {
            client.delete(lifecycle_url(&cli.url, &group, &version))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await?;
    Ok(())
}

fn lifecycle_url(base: &str, group: &str, version: &str) -> String {
    format!("{}/admin/groups/{}/versions/{}/deprecate", base, group, version)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
