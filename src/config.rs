use crate::models::ImageFormat;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf, time::Duration};

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Centralized client configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub token: Option<String>,
    /// Default signed URL lifetime in seconds.
    pub expires_in: u64,
    pub timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Upload and manage media assets served through the CDN")]
pub struct Args {
    /// Backend base URL (overrides MEDIA_CONSOLE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides MEDIA_CONSOLE_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Whole-request timeout in seconds (overrides MEDIA_CONSOLE_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Upload files one after another, stopping at the first failure
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Folder to upload into
        #[arg(long)]
        folder: Option<String>,
        /// Store the object under this name (single file only)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the URL an asset should be fetched from
    Url {
        id: String,
        /// Signed URL lifetime for private assets (overrides MEDIA_CONSOLE_EXPIRES_IN)
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// Generate a signed URL, optionally transformed
    Sign {
        id: String,
        #[arg(long)]
        expires_in: Option<u64>,
        #[arg(long)]
        format: Option<ImageFormat>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
    /// Show one asset as JSON
    Show { id: String },
    /// Show request, bandwidth and cache statistics for an asset
    Stats { id: String },
    /// List one page of assets
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Move an asset to private storage
    MakePrivate {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Move an asset back to public storage
    MakePublic {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Ask the CDN to drop cached copies of an asset
    Invalidate { id: String },
    /// Soft-delete an asset
    Delete { id: String },
    /// Restore a soft-deleted asset
    Restore { id: String },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        // Parse CLI once
        let args = Args::parse();
        let cfg = Self::resolve(&args, |name| env::var(name).ok())?;
        Ok((cfg, args.command))
    }

    /// Merge `args` over values found through `lookup`.
    pub fn resolve(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_url = lookup("MEDIA_CONSOLE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let env_token = lookup("MEDIA_CONSOLE_TOKEN");
        let env_expires = parse_var(&lookup, "MEDIA_CONSOLE_EXPIRES_IN")?;
        let env_timeout = parse_var(&lookup, "MEDIA_CONSOLE_TIMEOUT_SECS")?;

        // --- Merge ---
        Ok(Self {
            api_url: args.api_url.clone().unwrap_or(env_url),
            token: args
                .token
                .clone()
                .or(env_token)
                .filter(|t| !t.trim().is_empty()),
            expires_in: env_expires.unwrap_or(DEFAULT_EXPIRES_IN),
            timeout: args
                .timeout_secs
                .or(env_timeout)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}
