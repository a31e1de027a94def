mod cli;
mod input;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use input::InputReader;
use nowbar_core::{init_logging, AppDirs, Config};
use nowbar_dbus::DBusGateway;
use nowbar_session::{
    channel, Event, EventSender, PlayerName, Session, SessionSettings, Startup, StdoutSink,
};
use std::sync::Arc;
use std::time::Duration;

/// How long pending blocking work (a stdin read) may delay exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let file = Config::load(&dirs, cli.config.as_deref())?;
    let config = file.merge(cli.overrides());
    config.validate()?;
    let player = config
        .player
        .clone()
        .ok_or_else(|| anyhow!("player is not specified"))?;
    let _logging = init_logging(&config.logging, &dirs)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run(&cli, config, &player));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(cli: &Cli, config: Config, player: &str) -> Result<()> {
    let (events, mut receiver) = channel();
    let gateway = DBusGateway::session(events.clone())
        .await
        .context("failed to connect to the session bus")?;

    let settings = SessionSettings {
        player: PlayerName::normalize(player),
        template: config.template()?,
        formatter: config.formatter(),
        placeholder: config.placeholder,
        mouse_buttons: config.mouse_buttons,
        dedupe: config.dedupe,
    };
    tracing::info!(
        player = %settings.player,
        format = %settings.template,
        "starting nowbar"
    );

    let mut session = Session::new(Arc::new(gateway), StdoutSink, settings);
    if session.start(!cli.nowait).await? == Startup::NotFound {
        return Ok(());
    }

    let input = (!cli.no_input).then(|| InputReader::stdin(events.clone()));
    tokio::spawn(forward_shutdown(events));

    let result = session.run(&mut receiver).await;
    if let Some(input) = input {
        input.close().await;
    }
    tracing::info!("nowbar stopped");
    result.map_err(Into::into)
}

/// Turns SIGINT or SIGTERM into a shutdown event.
async fn forward_shutdown(events: EventSender) {
    match shutdown_signal().await {
        Ok(()) => tracing::debug!("shutdown signal received"),
        Err(err) => {
            tracing::warn!(error = %err, "failed to listen for shutdown signals");
            return;
        }
    }
    let _ = events.send(Event::Shutdown);
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
