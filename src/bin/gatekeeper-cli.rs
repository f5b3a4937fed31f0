use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use gatekeeper::auth::{Role, TokenIssuer, TokenVerifier};
use gatekeeper::config::AuthConfig;
use gatekeeper::lifecycle::startup;

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Token and health tooling for the Gatekeeper gateway", long_about = None)]
struct Cli {
    /// Gateway config file; its `auth` section supplies the secret variable and token lifetime
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Environment variable holding the signing secret (overrides `auth.secret_env`)
    #[arg(long)]
    secret_env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a signed bearer token
    IssueToken {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        role: Role,
        /// Lifetime in seconds (overrides `auth.token_ttl_secs`)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Verify a token and print its principal
    VerifyToken { token: String },
    /// Query a running gateway's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut auth = startup::load(cli.config.as_deref())?.auth;
    if let Some(secret_env) = cli.secret_env {
        auth.secret_env = secret_env;
    }

    match cli.command {
        Commands::IssueToken {
            subject,
            role,
            ttl_secs,
        } => {
            let ttl = token_ttl(&auth, ttl_secs);
            let issuer = TokenIssuer::new(startup::signing_key(&auth)?);
            println!("{}", issuer.issue(&subject, role, ttl)?);
        }
        Commands::VerifyToken { token } => {
            let verifier = TokenVerifier::new(startup::signing_key(&auth)?)
                .with_leeway(Duration::from_secs(auth.leeway_secs));
            match verifier.verify(Some(&token)) {
                Ok(principal) => println!(
                    "{}",
                    serde_json::json!({ "id": principal.subject_id, "role": principal.role })
                ),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Health { url } => {
            let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn token_ttl(auth: &AuthConfig, ttl_secs: Option<u64>) -> Duration {
    ttl_secs.map(Duration::from_secs).unwrap_or_else(|| auth.token_ttl())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
