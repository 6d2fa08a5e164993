//! `msel-agent` -- headless MSEL sync client.
//!
//! Signs in with a bearer token, loads the user's MSELs over REST, joins
//! the realtime hub and keeps the session stores in sync until Ctrl-C.
//! Capability changes and failed operations are logged.
//!
//! See [`AgentConfig::from_env`](msel_agent::config::AgentConfig::from_env)
//! for the environment variables.

use std::sync::Arc;

use msel_agent::capabilities::watch_capabilities;
use msel_agent::config::AgentConfig;
use msel_agent::credentials::watch_token_file;
use msel_agent::session::Session;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msel_agent=info,msel_realtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_url = %config.api_url,
        hub_url = %config.hub_url,
        area = %config.area,
        user_id = %config.user_id,
        "Starting msel-agent",
    );

    let session = Arc::new(Session::new(&config));
    let cancel = CancellationToken::new();

    let mut failures = session.failures.subscribe();
    tokio::spawn(async move {
        loop {
            match failures.recv().await {
                Ok(failure) => tracing::error!(
                    entity = failure.entity,
                    operation = %failure.operation,
                    target_id = ?failure.target_id,
                    status = ?failure.status,
                    message = %failure.message,
                    "Data service operation failed",
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Failure log lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(path) = &config.token_file {
        let (tokens, _poller) = watch_token_file(
            path.clone(),
            config.token_poll,
            config.token.clone(),
            cancel.clone(),
        );
        let _rotation = session.follow_credentials(tokens);
    }

    let (mut capabilities, _watcher) =
        watch_capabilities(Arc::clone(&session.stores), config.user_id, cancel.clone());
    tokio::spawn(async move {
        while capabilities.changed().await.is_ok() {
            let current = *capabilities.borrow_and_update();
            tracing::info!(
                owner = current.owner,
                approver = current.approver,
                editor = current.editor,
                move_editor = current.move_editor,
                evaluator = current.evaluator,
                viewer = current.viewer,
                "Capabilities on active MSEL",
            );
        }
    });

    let mut state = session.sync.state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            tracing::info!(state = ?current, "Hub connection state");
        }
    });

    if let Err(e) = session.open().await {
        tracing::error!(error = %e, "Failed to connect to the realtime hub");
        session.close().await;
        std::process::exit(1);
    }

    let msel_id = config
        .msel_id
        .or_else(|| session.msels.query().get_all().first().map(|msel| msel.id));
    match msel_id {
        Some(id) => session.select_msel(id).await,
        None => tracing::warn!("No MSEL available to open"),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }

    tracing::info!("Shutting down msel-agent");
    cancel.cancel();
    session.close().await;
}
