//! Subscribe to an event stream and print everything it delivers.
//!
//! Usage: cargo run --example listen -- <url> [event-name ...]
//!
//! Set `RUST_LOG=eventsource=debug` to watch connection handling.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use eventsource::{EventSource, EventSourceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| eyre!("usage: listen <url> [event-name ...]"))?;

    let config = EventSourceConfig::new(&url)?;
    let source = EventSource::with_defaults(config).await?;

    source.on_open(|| info!("stream open"));
    source.on_message(|id, name, data| {
        println!("[{}] id={:?} data={:?}", name, id, data);
    });
    source.on_complete(|status, should_retry, error| match error {
        Some(err) => eprintln!("stream ended: {} (status {:?})", err.user_message(), status),
        None => info!(
            "stream ended with status {:?}, reconnecting: {:?}",
            status, should_retry
        ),
    });

    for name in args {
        source.add_event_listener(name, |id, name, data| {
            println!("[{}] id={:?} data={:?}", name, id, data);
        });
    }

    if let Some(id) = source.last_event_id() {
        info!("resuming after event {}", id);
    }
    source.connect(None);

    tokio::signal::ctrl_c().await?;
    source.disconnect();
    info!("disconnected");

    Ok(())
}
