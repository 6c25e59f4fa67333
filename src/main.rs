use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use wedding_uploader::{
    client::{LocalFile, StatusView, Timings, UploadMode, UploadSession, Uploader},
    config::Config,
    routes::create_router,
    utils::{init_client_logger, init_logger},
    AppState,
};

#[derive(Parser)]
#[command(name = "wedding-uploader", version, about = "Photo and video uploads for wedding guests")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the upload broker (default)
    Serve,
    /// Upload files through a running broker, one at a time
    Upload {
        /// Broker base URL
        #[arg(long, env = "UPLOADER_SERVER", default_value = "http://localhost:3000")]
        server: String,
        /// Send files through the server relay instead of signed URLs
        #[arg(long)]
        relay: bool,
        /// Also send files that are not images or videos
        #[arg(long)]
        any_type: bool,
        /// Skip the thanks pause at the end
        #[arg(long)]
        no_wait: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List files stored by the script service
    List {
        #[arg(long, env = "UPLOADER_SERVER", default_value = "http://localhost:3000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Upload {
            server,
            relay,
            any_type,
            no_wait,
            files,
        } => {
            init_client_logger();
            let mode = if relay { UploadMode::Relayed } else { UploadMode::Direct };
            upload(&server, mode, any_type, no_wait, &files).await
        }
        Command::List { server } => {
            init_client_logger();
            let uploader = Uploader::new(&server)?;
            for file in uploader.list_files().await? {
                println!("{}\t{}\t{}\t{}", file.date_created, file.mime_type, file.name, file.url);
            }
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create shared state
    let state = AppState::from_config(config)?;
    info!(
        storage = state.issuer.provider(),
        relay = ?state.relay.as_ref().map(|r| r.kind()),
        "Upload backends ready"
    );

    // Create router
    let app = create_router(state);

    // Start server
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn upload(
    server: &str,
    mode: UploadMode,
    any_type: bool,
    no_wait: bool,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = LocalFile::read(path).await?;
        if !any_type && !file.is_media() {
            warn!(file = %path.display(), "Skipping file that is not an image or video");
            continue;
        }
        files.push(file);
    }
    if files.is_empty() {
        anyhow::bail!("no images or videos to upload");
    }

    let uploader = Uploader::new(server)?;
    let mut session = UploadSession::new();
    let mut view = StatusView::new();
    let mut stdout = io::stdout();

    uploader
        .upload_all(&mut session, &files, mode, |s| {
            view.redraw(&mut stdout, s);
        })
        .await;

    let (succeeded, failed) = (session.succeeded(), session.failed());

    if !no_wait {
        session
            .wind_down(Timings::default(), |s| {
                view.redraw(&mut stdout, s);
            })
            .await;
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to upload", failed, succeeded + failed);
    }
    Ok(())
}
