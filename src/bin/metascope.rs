// metascope - metadata viewer CLI and organ daemon
// `inspect` analyzes one file in the terminal; `serve` exposes the organ over a Unix Domain Socket

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use metascope::organ::{MetadataOrgan, Organ, Response, Stimulus};
use metascope::{render_tree, AnalysisOutcome, Analyzer, ViewerConfig};

/// Largest accepted request frame
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "metascope",
    version,
    about = "Photo metadata viewer: device, date/time and GPS with reverse geocoding"
)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a file and print its metadata report
    Inspect {
        file: PathBuf,

        /// Write the report (and address) as JSON
        #[arg(long)]
        export: Option<PathBuf>,

        /// Save a map image of the photo's location
        #[arg(long)]
        map: Option<PathBuf>,

        /// Skip reverse geocoding and map downloads
        #[arg(long)]
        offline: bool,
    },

    /// Serve the metadata organ over a Unix socket
    Serve {
        #[arg(long, default_value = "/tmp/metascope.sock")]
        socket_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config =
        ViewerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Inspect {
            file,
            export,
            map,
            offline,
        } => inspect(config, &file, export.as_deref(), map.as_deref(), offline).await,
        Command::Serve { socket_path } => serve(config, &socket_path).await,
    }
}

async fn inspect(
    mut config: ViewerConfig,
    file: &Path,
    export: Option<&Path>,
    map: Option<&Path>,
    offline: bool,
) -> Result<()> {
    if offline {
        config.geocoder.enabled = false;
    }

    let analyzer = Analyzer::new(&config).context("Failed to initialize analyzer")?;
    let outcome = analyzer.analyze(file).await;

    print!("{}", render_tree(&outcome.display_nodes()));

    let AnalysisOutcome::Analyzed(result) = outcome else {
        if export.is_some() || map.is_some() {
            bail!("Nothing to export for {}", file.display());
        }
        return Ok(());
    };

    if let Some(path) = export {
        result
            .export_json(path)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        println!("Metadata exported to {}", path.display());
    }

    if let Some(path) = map {
        match analyzer.map_image(&result).await {
            Some(image) => {
                std::fs::write(path, &image)
                    .with_context(|| format!("Failed to write map to {}", path.display()))?;
                println!("Map saved to {}", path.display());
            }
            None => println!("No map available for this file."),
        }
    }

    Ok(())
}

async fn serve(config: ViewerConfig, socket_path: &str) -> Result<()> {
    info!("Starting metascope daemon");
    info!("   Socket: {}", socket_path);

    let start_time = std::time::Instant::now();

    let organ =
        Arc::new(MetadataOrgan::from_config(&config).context("Failed to initialize organ")?);
    info!(
        "   ✓ Metadata organ initialized (geocoding {})",
        if config.geocoder.enabled { "on" } else { "off" }
    );

    // Remove old socket if exists
    let socket = PathBuf::from(socket_path);
    if socket.exists() {
        std::fs::remove_file(&socket).context("Failed to remove old socket")?;
    }

    let listener = UnixListener::bind(&socket).context("Failed to bind Unix socket")?;
    info!("   ✓ Listening on {}", socket_path);

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let organ = Arc::clone(&organ);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, organ, start_time).await {
                        error!("Connection error: {:#}", e);
                    }
                });
            }
            Err(e) => {
                error!("Accept error: {}", e);
            }
        }
    }
}

/// Handle a single UDS connection
async fn handle_connection(
    mut stream: UnixStream,
    organ: Arc<MetadataOrgan>,
    start_time: std::time::Instant,
) -> Result<()> {
    let mut buffer = vec![0u8; 65536];

    loop {
        // Request length (4 bytes, big-endian)
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Client disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_BYTES {
            bail!("Request frame of {} bytes exceeds limit", len);
        }
        if len > buffer.len() {
            buffer.resize(len, 0);
        }

        stream.read_exact(&mut buffer[..len]).await?;

        let stimulus: Stimulus =
            serde_json::from_slice(&buffer[..len]).context("Failed to parse stimulus")?;

        debug!("Received: op={}", stimulus.op);

        let response = if stimulus.op == "health" || stimulus.op == "health.check" {
            Response {
                ok: true,
                output: serde_json::json!({
                    "status": "healthy",
                    "organ": "metascope",
                    "version": env!("CARGO_PKG_VERSION"),
                    "uptime_ms": start_time.elapsed().as_millis() as u64,
                }),
                latency_ms: 0,
                cost: None,
            }
        } else {
            match organ.stimulate(stimulus).await {
                Ok(resp) => resp,
                Err(e) => {
                    error!("Stimulate error: {:?}", e);
                    Response {
                        ok: false,
                        output: serde_json::json!({ "error": e.to_string() }),
                        latency_ms: 0,
                        cost: None,
                    }
                }
            }
        };

        let response_bytes =
            serde_json::to_vec(&response).context("Failed to serialize response")?;

        let len_bytes = (response_bytes.len() as u32).to_be_bytes();
        stream.write_all(&len_bytes).await?;
        stream.write_all(&response_bytes).await?;
        stream.flush().await?;

        debug!("Sent: ok={}, latency={}ms", response.ok, response.latency_ms);
    }
}
