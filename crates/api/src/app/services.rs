use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{info, warn};

use citycat_core::CityId;
use citycat_events::{EventBus, InMemoryEventBus};
use citycat_infra::{
    CatalogEnvelope, CatalogService, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreResult,
};

use crate::config::ApiConfig;

/// The catalog service as wired for HTTP: any store behind a trait object, an
/// in-process bus for change notifications.
pub type AppCatalog = CatalogService<Arc<dyn CatalogStore>, Arc<InMemoryEventBus<CatalogEnvelope>>>;

pub struct AppServices {
    catalog: AppCatalog,
    realtime_tx: broadcast::Sender<CatalogEnvelope>,
}

impl AppServices {
    pub fn catalog(&self) -> &AppCatalog {
        &self.catalog
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<CatalogEnvelope> {
        &self.realtime_tx
    }
}

/// Pick the store from configuration and wire the bus fan-out.
pub async fn build_services(config: &ApiConfig) -> StoreResult<AppServices> {
    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url).await?;
            store.ensure_schema().await?;
            info!("using postgres catalog store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory catalog store");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    Ok(wire(store))
}

/// Services over an explicit store (tests, embedding).
pub fn wire(store: Arc<dyn CatalogStore>) -> AppServices {
    let bus: Arc<InMemoryEventBus<CatalogEnvelope>> = Arc::new(InMemoryEventBus::new());

    // Realtime channel (SSE): lossy broadcast, city-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<CatalogEnvelope>(256);

    // Background subscriber: bus -> realtime channel
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(envelope) = sub.recv() {
                // No SSE clients connected is not an error.
                let _ = realtime_tx.send(envelope);
            }
        });
    }

    AppServices {
        catalog: CatalogService::new(store, bus),
        realtime_tx,
    }
}

/// Build an SSE stream of committed changes, optionally narrowed to what one city can
/// see (its own changes plus global ones).
pub fn catalog_sse_stream(
    services: Arc<AppServices>,
    city: Option<CityId>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(envelope) if city.is_none_or(|c| envelope.is_visible_to(c)) => {
            match SseEvent::default()
                .event(envelope.event_type())
                .id(envelope.sequence_number().to_string())
                .json_data(&envelope)
            {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    warn!(error = %e, sequence = envelope.sequence_number(), "dropping unencodable catalog event");
                    None
                }
            }
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
