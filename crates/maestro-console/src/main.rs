//! Conservatory console entry point
//!
//! Run with:
//! ```bash
//! cargo run -p maestro-console -- student/42/updates orchestra/7/updates
//! ```
//!
//! Configuration is loaded from environment variables. Channel names passed
//! on the command line are subscribed before connecting; received events are
//! logged until ctrl-c.

use maestro_api::{ApiClient, TokenStore};
use maestro_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use maestro_realtime::{Channel, EventType, RealtimeClient, RealtimeConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Tracing comes up before the full config load so load errors are logged.
    let tracing_config = match std::env::var("APP_ENV").as_deref() {
        Ok("production") => TracingConfig::production(),
        _ => TracingConfig::default(),
    };
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Console failed to start");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting conservatory console...");

    let config = AppConfig::from_env()?;
    info!(
        env = ?config.app.env,
        api = %config.api.base_url,
        realtime = %config.realtime.url,
        "Configuration loaded"
    );

    let tokens = TokenStore::new_shared();
    if let Ok(token) = std::env::var("API_TOKEN") {
        tokens.set_token(token);
    }
    let _api = ApiClient::new(&config.api.base_url, tokens.clone())?;

    let client = RealtimeClient::new(
        RealtimeConfig::from_settings(&config.realtime),
        tokens,
    );

    register_log_handlers(&client);

    for arg in std::env::args().skip(1) {
        match arg.parse::<Channel>() {
            Ok(channel) => client.subscribe_channel(channel),
            Err(e) => warn!(channel = %arg, error = %e, "Skipping invalid channel argument"),
        }
    }

    client.connect().await;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.disconnect();

    Ok(())
}

fn register_log_handlers(client: &RealtimeClient) {
    for event in [
        EventType::StudentUpdate,
        EventType::AttendanceUpdate,
        EventType::ScheduleUpdate,
        EventType::DocumentUpdate,
    ] {
        let _guard = client.on(event, |envelope| {
            info!(
                event = %envelope.event,
                entity = envelope.entity_id.as_deref().unwrap_or("-"),
                "Update received"
            );
        });
    }

    let _guard = client.on_any(|envelope| {
        tracing::debug!(event = %envelope.event, data = %envelope.data, "Event payload");
    });
}
