use anyhow::Context;
use blossom_crypto::SigningKey;
use blossom_gate::{AuthEvent, Tag, Tags, BLOSSOM_AUTH_KIND};
use blossom_server::{BlobServer, ServerConfig};
use blossom_store::{BlobStore, BlobStoreConfig};
use blossom_types::{unix_now, BlobHash};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Stats(args) => cmd_stats(args, cli.format),
        Command::Sign(args) => cmd_sign(args, cli.format),
    }
}

/// Config file (or defaults) with the `--data-dir` override applied.
pub fn load_config(storage: &StorageArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &storage.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &storage.data_dir {
        config.store = BlobStoreConfig {
            max_blob_size: config.store.max_blob_size,
            ..BlobStoreConfig::under(dir)
        };
    }
    debug!(
        config = ?storage.config,
        storage_root = %config.store.storage_root.display(),
        database = %config.store.database_path.display(),
        "Configuration loaded"
    );
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.storage)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.public_url {
        config.public_url = Some(url);
    }

    println!(
        "{} Blossom server on {} (blobs: {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.store.storage_root.display()
    );

    info!(
        bind = %config.bind_addr,
        require_auth_for_upload = config.require_auth_for_upload,
        require_auth_for_get = config.require_auth_for_get,
        require_auth_for_delete = config.require_auth_for_delete,
        "Starting server"
    );
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(BlobServer::new(config).serve())?;
    Ok(())
}

fn cmd_stats(args: StatsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&args.storage)?;
    let store = BlobStore::open(config.store.clone())
        .with_context(|| format!("opening store at {}", config.store.storage_root.display()))?;
    let stats = store.stats()?;

    match format {
        OutputFormat::Json => {
            let out = json!({
                "blob_count": stats.blob_count,
                "total_size": stats.total_size,
                "storage_root": config.store.storage_root,
                "database_path": config.store.database_path,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("Storage root: {}", config.store.storage_root.display());
            println!("Database:     {}", config.store.database_path.display());
            println!("Blobs:        {}", stats.blob_count.to_string().bold());
            println!("Total size:   {}", format_size(stats.total_size).bold());
        }
    }
    Ok(())
}

fn cmd_sign(args: SignArgs, format: OutputFormat) -> anyhow::Result<()> {
    let key = match &args.secret {
        Some(secret) => SigningKey::from_hex(secret.trim()).context("invalid secret key")?,
        None => SigningKey::generate(),
    };

    let hash = args
        .hash
        .as_deref()
        .map(|h| BlobHash::parse(h).context("invalid --hash"))
        .transpose()?;

    let event = build_auth_event(&key, &args.action, hash.as_ref(), args.ttl, args.content)?;
    debug!(action = %args.action, pubkey = %event.pubkey, expiration = ?event.expiration(), "Signed auth event");
    let header = event.to_header()?;

    match format {
        OutputFormat::Json => {
            let out = json!({
                "pubkey": event.pubkey,
                "expiration": event.expiration(),
                "authorization": header,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            eprintln!("{} {}", "pubkey:".dimmed(), event.pubkey.cyan());
            println!("{header}");
        }
    }
    Ok(())
}

/// A kind-24242 event for `action`, valid for `ttl` seconds from now.
pub fn build_auth_event(
    key: &SigningKey,
    action: &str,
    hash: Option<&BlobHash>,
    ttl: u64,
    content: Option<String>,
) -> anyhow::Result<AuthEvent> {
    let now = unix_now();
    let mut tags = vec![
        Tag::new("t", action),
        Tag::new("expiration", now.saturating_add(ttl).to_string()),
    ];
    if let Some(hash) = hash {
        tags.push(Tag::new("x", hash.to_hex()));
    }
    let content = content.unwrap_or_else(|| format!("Authorize {action}"));
    Ok(AuthEvent::sign(key, BLOSSOM_AUTH_KIND, now, Tags::new(tags), content)?)
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blossom_gate::{AuthGate, AuthRequest, GateConfig};
    use std::path::PathBuf;

    #[test]
    fn signed_event_passes_the_gate() {
        let key = SigningKey::from_bytes(&[3u8; 32]).unwrap();
        let hash = BlobHash::from_digest([0x11; 32]);
        let event = build_auth_event(&key, "delete", Some(&hash), 60, None).unwrap();
        assert_eq!(event.content, "Authorize delete");

        let gate = AuthGate::with_default_stages(GateConfig::default());
        let header = event.to_header().unwrap();
        let hex = hash.to_hex();
        let decision = gate.validate(Some(&header), AuthRequest::new("delete").with_hash(&hex));
        assert!(decision.is_valid(), "{:?}", decision.reason);
        assert_eq!(decision.pubkey, Some(key.verifying_key().to_hex()));
    }

    #[test]
    fn data_dir_overrides_paths_only() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("blossom.toml");
        std::fs::write(&config_path, "[store]\nmax_blob_size = 1024\n").unwrap();

        let storage = StorageArgs {
            config: Some(config_path),
            data_dir: Some(PathBuf::from("/srv/blossom")),
        };
        let config = load_config(&storage).unwrap();
        assert_eq!(config.store.max_blob_size, 1024);
        assert_eq!(config.store.storage_root, PathBuf::from("/srv/blossom/blobs"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let storage = StorageArgs {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            data_dir: None,
        };
        assert!(load_config(&storage).is_err());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(100 * 1024 * 1024), "100.0 MiB");
    }
}
