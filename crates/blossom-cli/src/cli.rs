use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blossom",
    about = "Blossom: content-addressed blob server with Nostr authorization",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP blob server
    Serve(ServeArgs),
    /// Show blob count and stored bytes
    Stats(StatsArgs),
    /// Mint a signed Authorization header for an action
    Sign(SignArgs),
}

/// Where to find configuration and storage.
#[derive(Args, Clone, Debug, Default)]
pub struct StorageArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Data directory; overrides the configured blob root and database path
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub storage: StorageArgs,
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
    /// Public base URL used in blob descriptors
    #[arg(long)]
    pub public_url: Option<String>,
}

#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub storage: StorageArgs,
}

#[derive(Args)]
pub struct SignArgs {
    /// Hex-encoded 32-byte secret key; a fresh key is generated if omitted
    #[arg(short, long)]
    pub secret: Option<String>,
    /// Action the credential authorizes (upload, get, delete, list)
    #[arg(short, long)]
    pub action: String,
    /// Bind the credential to a blob hash (`x` tag)
    #[arg(long)]
    pub hash: Option<String>,
    /// Seconds until the credential expires
    #[arg(long, default_value_t = 300)]
    pub ttl: u64,
    /// Human-readable event content
    #[arg(long)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from([
            "blossom", "serve", "--config", "blossom.toml", "--bind", "0.0.0.0:8080",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.storage.config, Some(PathBuf::from("blossom.toml")));
        assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        assert!(args.storage.data_dir.is_none());
    }

    #[test]
    fn parses_sign_defaults() {
        let cli = Cli::parse_from(["blossom", "sign", "--action", "upload"]);
        let Command::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.action, "upload");
        assert_eq!(args.ttl, 300);
        assert!(args.secret.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["blossom", "stats", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn verify_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
