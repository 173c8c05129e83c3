use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fd_core::cli_args::{Cli, Commands};
use fd_core::client::{ApiClient, HttpApiClient};
use fd_core::configuration::DispatcherConfiguration;
use fd_core::dispatcher::{Dispatcher, DispatcherState};
use fd_core::reqwest_helpers::create_client;
use fd_domain::{DispatcherEvent, StateUpdate};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command.clone() {
        Commands::RunDispatcher { .. } => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_span_events(fmt::format::FmtSpan::CLOSE))
                .with(EnvFilter::from_default_env())
                .init();

            let cfg = DispatcherConfiguration::new(args.command);
            run_dispatcher(cfg).await
        }
    }
}

async fn run_dispatcher(cfg: DispatcherConfiguration) -> Result<()> {
    let client_with_middleware = create_client(Some(cfg.token.clone()));
    let client: Arc<dyn ApiClient> =
        Arc::new(HttpApiClient::new(client_with_middleware, cfg.base_url.clone()));

    let snapshot = client.get_fleet_snapshot().await?;
    event!(
        Level::INFO,
        ships = snapshot.ships.len(),
        systems = snapshot.systems.len(),
        credits = snapshot.credits,
        home_system = %cfg.home_system.0,
        "fleet snapshot loaded, starting dispatcher",
    );

    let state = DispatcherState::from_snapshot(snapshot, cfg.home_system);
    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<DispatcherEvent>(256);
    let dispatcher = Dispatcher::new(client, state, events_tx);

    let cancel = CancellationToken::new();
    let run_handle = tokio::spawn(dispatcher.run(cancel.clone()));

    let event_handle = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                DispatcherEvent::Update(StateUpdate::CreditsChanged(credits)) => {
                    event!(Level::INFO, credits, "credits changed");
                }
                DispatcherEvent::Update(StateUpdate::ShipUpdated(ship)) => {
                    event!(
                        Level::DEBUG,
                        ship = %ship.id.0,
                        location = ship.location.as_ref().map(|l| l.0.as_str()).unwrap_or("in transit"),
                        "ship updated",
                    );
                }
                DispatcherEvent::Update(StateUpdate::MarketUpdated(snapshot)) => {
                    event!(
                        Level::DEBUG,
                        location = %snapshot.location.0,
                        goods = snapshot.goods.len(),
                        "market updated",
                    );
                }
                DispatcherEvent::Halted(halted) => {
                    event!(
                        Level::ERROR,
                        ship = halted.ship_id.as_ref().map(|s| s.0.as_str()).unwrap_or("-"),
                        error = %halted.message,
                        "dispatcher halted",
                    );
                    return;
                }
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            event!(Level::INFO, "ctrl-c received, shutting down");
            cancel.cancel();
        }
        _ = run_handle => {}
    }

    event_handle.abort();
    Ok(())
}
