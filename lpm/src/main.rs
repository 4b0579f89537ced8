use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lpm::ReferenceManifest;
use lpm::config::LpmConfig;
use lpm::config_annotate::annotate_config;
use lpm::emit::{parse_reference, read_credentials};
use lpm::publish::{RegistryPublisher, RegistrySettings};

/// lpm - analyze, generate, and push layer provenance metadata (lpm) for container images
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RegistryArgs {
    /// Username to use for authentication with the registry
    #[arg(short, long)]
    username: Option<String>,

    /// Password to use for authentication with the registry
    #[arg(short, long, conflicts_with = "password_stdin")]
    password: Option<String>,

    /// Read the registry password from stdin
    #[arg(long)]
    password_stdin: bool,

    /// Subject image reference, e.g. myregistry.myserver.io/myimage:latest or myimage@digest
    #[arg(short, long)]
    subject_image_ref: String,

    /// Target artifact reference the generated manifest is pushed to
    #[arg(short = 't', long)]
    lpm_manifest_artifact_ref: Option<String>,

    /// Also write the generated manifest to this file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Push over plain http instead of https
    #[arg(long)]
    plain_http: bool,

    /// Give up on the push after this many seconds
    #[arg(long)]
    push_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate layer provenance metadata from a Dockerfile and the subject image manifest
    Analyze {
        /// Subject image's Dockerfile
        #[arg(short, long)]
        dockerfile: PathBuf,

        /// Subject image manifest file (JSON)
        #[arg(short = 'm', long)]
        subject_image_manifest: PathBuf,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Generate a manifest whose config carries the given annotations
    ConfigAnnotate {
        /// Media type of the generated manifest
        #[arg(short = 'm', long)]
        manifest_media_type: String,

        /// Media type of the generated manifest's config
        #[arg(short, long)]
        config_media_type: String,

        /// Annotation to add to the config, as "key: value" (repeatable)
        #[arg(short, long = "annotation", required = true)]
        annotations: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout may carry the manifest
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = LpmConfig::load()?;

    let (manifest, registry) = match cli.command {
        Commands::Analyze {
            dockerfile,
            subject_image_manifest,
            registry,
        } => (lpm::analyze_files(&dockerfile, &subject_image_manifest)?, registry),
        Commands::ConfigAnnotate {
            manifest_media_type,
            config_media_type,
            annotations,
            registry,
        } => (
            annotate_config(&manifest_media_type, &config_media_type, &annotations)?,
            registry,
        ),
    };

    emit(&config, &manifest, &registry).await
}

async fn emit(config: &LpmConfig, manifest: &ReferenceManifest, registry: &RegistryArgs) -> Result<()> {
    // Everything is checked before the output is written or stdin is read
    parse_reference(&registry.subject_image_ref)?;
    let target = registry.lpm_manifest_artifact_ref.as_deref();
    if let Some(target) = target {
        parse_reference(target)?;
    }

    let credentials = match target {
        Some(_) => {
            let mut stdin = io::stdin().lock();
            let password_stdin = registry
                .password_stdin
                .then_some(&mut stdin as &mut dyn BufRead);
            read_credentials(
                registry.username.as_deref(),
                registry.password.as_deref(),
                password_stdin,
            )?
        }
        None => None,
    };

    let publisher = RegistryPublisher::new(
        credentials,
        RegistrySettings {
            plain_http: registry.plain_http || config.plain_http,
            default_registry: config.default_registry.clone(),
        },
    );
    let timeout = registry
        .push_timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.push_timeout());

    if let Some(target) = target {
        info!(
            "'{}' will be pushed as a reference to subject image '{}'",
            target, registry.subject_image_ref
        );
    }
    lpm::emit(manifest, registry.output.as_deref(), target, &publisher, timeout).await?;
    Ok(())
}
