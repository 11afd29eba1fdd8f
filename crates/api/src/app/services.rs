//! Infrastructure wiring: event store + bus + wallet service, and the SSE
//! fan-out fed from the bus.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use quorumtoken_events::{EventBus, EventEnvelope, InMemoryEventBus};
use quorumtoken_infra::{
    AppConfig, ServiceError, WalletService,
    event_store::{AnyEventStore, FileEventStore, InMemoryEventStore},
};

pub type ApiBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type ApiWalletService = WalletService<AnyEventStore, ApiBus>;

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppServices {
    wallet: ApiWalletService,
    realtime_tx: broadcast::Sender<EventEnvelope<JsonValue>>,
}

impl AppServices {
    pub fn wallet(&self) -> &ApiWalletService {
        &self.wallet
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<EventEnvelope<JsonValue>> {
        &self.realtime_tx
    }
}

/// Open the configured store, rebuild (or create) the wallet, and bridge the
/// bus into a broadcast channel for SSE clients.
///
/// Must be called from within a Tokio runtime.
pub fn build_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    let store = match &config.store.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file event store");
            AnyEventStore::File(FileEventStore::open(path)?)
        }
        None => {
            tracing::warn!("no store path configured; events are kept in memory only");
            AnyEventStore::Memory(InMemoryEventStore::new())
        }
    };

    let bus: ApiBus = Arc::new(InMemoryEventBus::new());

    // Realtime channel (SSE): lossy broadcast, no backpressure on the wallet.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<EventEnvelope<JsonValue>>(256);
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        // Ends when the bus (owned by the wallet service) is dropped.
        tokio::task::spawn_blocking(move || {
            while let Ok(env) = sub.recv() {
                let _ = realtime_tx.send(env);
            }
        });
    }

    let wallet = WalletService::open(store, bus, config.wallet_id, &config.wallet)?;

    Ok(AppServices {
        wallet,
        realtime_tx,
    })
}

/// Build the SSE stream of committed wallet events (used by `/events/stream`).
pub fn wallet_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(env) => {
            let data = serde_json::to_string(&env).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default()
                .event(env.event_type())
                .id(env.sequence_number().to_string())
                .data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
