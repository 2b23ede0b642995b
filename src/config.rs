use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use crate::services::upload_policy::DEFAULT_MAX_FILE_SIZE;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub github_owner: String,
    pub github_repo: String,
    pub github_branch: String,
    pub github_token: String,
    pub max_file_size: u64,
    pub public_base_url: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_ms: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "File upload API backed by a GitHub repository")]
pub struct Args {
    /// Host to bind to (overrides GITDROP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GITDROP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Repository owner (overrides GITHUB_OWNER)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name (overrides GITHUB_REPO)
    #[arg(long)]
    pub repo: Option<String>,

    /// Target branch for upload commits (overrides GITHUB_BRANCH)
    #[arg(long)]
    pub branch: Option<String>,

    /// Maximum upload size in bytes (overrides MAX_FILE_SIZE)
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Base URL used to build retrieval links (overrides PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    ///
    /// The API token is only ever read from `GITHUB_TOKEN`; there is no
    /// flag for it so it cannot leak into process listings.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GITDROP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("GITDROP_PORT", 3000u16)?;
        let env_owner = env::var("GITHUB_OWNER").ok();
        let env_repo = env::var("GITHUB_REPO").ok();
        let env_branch = env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".into());
        let github_token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN must be set")?;
        let env_max_size = parse_env("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?;
        let env_public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let rate_limit_max_requests = parse_env("RATE_LIMIT_MAX_REQUESTS", 10u32)?;
        let rate_limit_window_ms = parse_env("RATE_LIMIT_WINDOW_MS", 60_000u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            github_owner: args
                .owner
                .or(env_owner)
                .context("GITHUB_OWNER must be set (or pass --owner)")?,
            github_repo: args
                .repo
                .or(env_repo)
                .context("GITHUB_REPO must be set (or pass --repo)")?,
            github_branch: args.branch.unwrap_or(env_branch),
            github_token,
            max_file_size: args.max_file_size.unwrap_or(env_max_size),
            public_base_url: args.public_base_url.unwrap_or(env_public_base_url),
            rate_limit_max_requests,
            rate_limit_window_ms,
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read an env var as a number, falling back to `default` when unset.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
