use std::net::SocketAddr;

use clap::Parser;
use eyre::Result;
use log::info;
use tokio::net::TcpListener;
use tokio::signal;

mod cli;

use cli::Cli;
use ytsum::config::Config;
use ytsum::server::{self, AppState};

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = server::build_router(AppState::new(config))?;

    let listener = TcpListener::bind(addr).await?;
    info!("Server is running on port {}", addr.port());

    // ConnectInfo feeds peer addresses to the rate limiter.
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
