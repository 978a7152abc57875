//! Broadcast demo: accepts WebSocket clients speaking JSON or MessagePack
//! and sends every one of them a `tick` once per second.
//!
//! ```text
//! cargo run -p broadcast-demo -- [options.json] [addr]
//! ```
//!
//! Clients connect to `ws://<addr>` and send `{"protocol":"json","version":1}`
//! followed by the byte `0x1e` to join.

use std::sync::Arc;
use std::time::Duration;

use hubcast::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), HubcastError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let options = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                HubcastError::Config(format!("cannot read {path}: {e}"))
            })?;
            HubOptions::from_json_str(&text)?
        }
        None => HubOptions {
            protocols: vec![
                hubcast::ProtocolKind::Json,
                hubcast::ProtocolKind::MessagePack,
            ],
            ..HubOptions::default()
        },
    };
    options.validate()?;
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let clients = Arc::new(ClientFanout::<WebSocketConnection>::new());
    let context = HubContextBuilder::from_options(&options).build(Arc::clone(&clients))?;

    let supported: Vec<(String, TransferFormat)> = context
        .protocols()
        .resolve_all()
        .map(|p| (p.name().to_string(), p.transfer_format()))
        .collect();
    let transport = WebSocketTransport::bind(&addr, supported).await?;

    let mut incoming = transport.incoming();
    let accepting = Arc::clone(&clients);
    tokio::spawn(async move {
        while let Some(conn) = incoming.recv().await {
            accepting.add(conn).await;
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut count: i64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                count += 1;
                if let Err(e) = context.send_all("tick", [Value::from(count)]).await {
                    tracing::warn!(error = %e, "tick broadcast failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(hub = context.hub(), ticks = count, "shutting down");
                break;
            }
        }
    }

    Ok(())
}
