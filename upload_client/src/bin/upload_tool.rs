use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use progress_tracking::{ProgressUpdate, TrackingProgressUpdater};
use tracing_subscriber::EnvFilter;
use upload_client::{AuthConfig, SourceUploadSession, UploadSessionConfig};
use upload_types::VideoId;

const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Upload a video source file through the multipart upload engine.
#[derive(Parser)]
struct UploadCommand {
    /// Upload-coordination service endpoint.
    #[clap(long)]
    endpoint: Option<String>, // if not specified we use env:UPLOAD_ENDPOINT

    /// Bearer token for coordinator calls.
    #[clap(long)]
    token: Option<String>, // if not specified we use env:UPLOAD_TOKEN

    /// Id of the video the source belongs to.
    #[clap(long)]
    video_id: String,

    /// Content type of the source file.
    #[clap(long)]
    content_type: Option<String>,

    /// Maximum number of parts uploaded at once.
    #[clap(long)]
    concurrent_parts: Option<usize>,

    /// Path of the source file.
    file: PathBuf,
}

#[derive(Debug)]
struct ConsoleProgressUpdater;

#[async_trait::async_trait]
impl TrackingProgressUpdater for ConsoleProgressUpdater {
    async fn register_updates(&self, update: ProgressUpdate) {
        eprint!(
            "\ruploading: {:3}% ({} / {} bytes)",
            update.percent, update.total_bytes_completed, update.total_bytes
        );
        if update.percent == 100 {
            eprintln!();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cmd = UploadCommand::parse();

    let endpoint = cmd
        .endpoint
        .unwrap_or_else(|| std::env::var("UPLOAD_ENDPOINT").unwrap_or(DEFAULT_ENDPOINT.to_owned()));
    let token = cmd.token.or_else(|| std::env::var("UPLOAD_TOKEN").ok());

    let mut config = UploadSessionConfig::new(endpoint);
    config.auth = token.map(|token| AuthConfig { token });
    if let Some(concurrent_parts) = cmd.concurrent_parts {
        config.concurrent_parts = concurrent_parts;
    }

    let source = Bytes::from(std::fs::read(&cmd.file)?);
    let session = SourceUploadSession::new(config, Arc::new(ConsoleProgressUpdater))?;

    session
        .upload_source(&VideoId::new(cmd.video_id), source, cmd.content_type.as_deref())
        .await?;

    eprintln!("done: {}", cmd.file.display());
    Ok(())
}
