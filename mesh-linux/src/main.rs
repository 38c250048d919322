// MeshCore Linux host: config, logging, and a stdin console driving the daemon.

mod config;
mod console;

use std::sync::Arc;

use anyhow::Context;
use mesh_core::Daemon;
use tokio::io::{AsyncBufReadExt, BufReader};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("mesh-linux {}", VERSION);
            return Ok(());
        }
    }

    let cfg = config::load();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let daemon = Arc::new(Daemon::with_config(cfg.core_config()));
    if cfg.loopback {
        daemon.use_loopback();
    }
    daemon.set_callbacks(console::printing_callbacks());
    daemon.start().context("starting daemon")?;
    tracing::info!(version = VERSION, loopback = cfg.loopback, "mesh-linux ready, type `help`");

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        tokio::select! {
            r = run_console(daemon.clone()) => r,
            r = shutdown_signal() => r,
        }
    });
    // stdin reads run on a blocking thread that cannot be interrupted
    rt.shutdown_background();
    daemon.stop();
    result
}

/// Read commands from stdin until EOF or `quit`.
async fn run_console(daemon: Arc<Daemon>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match console::parse_command(&line) {
            Ok(console::Command::Quit) => break,
            Ok(cmd) => {
                if let Some(out) = console::execute(&daemon, cmd) {
                    println!("{}", out);
                }
            }
            Err(e) => println!("{} (try `help`)", e),
        }
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    tracing::info!("shutdown signal received");
    Ok(())
}
