//! Runs the [`Command`]s that [`App`](crate::app::App) transitions emit.
//!
//! Content loads and location lookups are spawned onto the runtime and
//! report back through the event channel, so their results are applied in
//! order with everything else. Persistence runs inline on the loop thread.

use crate::app::Command;
use crate::catalog::ContentCatalog;
use crate::events::Event;
use crate::location::GeolocationProvider;
use crate::store::PersistedSelection;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

pub struct Effects {
    tx: UnboundedSender<Event>,
    catalog: Arc<dyn ContentCatalog>,
    provider: Arc<GeolocationProvider>,
    selection: PersistedSelection,
}

impl Effects {
    pub fn new(
        tx: UnboundedSender<Event>,
        catalog: Arc<dyn ContentCatalog>,
        provider: Arc<GeolocationProvider>,
        selection: PersistedSelection,
    ) -> Self {
        Self {
            tx,
            catalog,
            provider,
            selection,
        }
    }

    pub fn selection(&self) -> &PersistedSelection {
        &self.selection
    }

    pub fn run(&self, commands: Vec<Command>) {
        for command in commands {
            self.run_one(command);
        }
    }

    fn run_one(&self, command: Command) {
        match command {
            Command::LoadDishes {
                ticket,
                city,
                delay,
            } => {
                let tx = self.tx.clone();
                let catalog = Arc::clone(&self.catalog);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let dishes = catalog.dishes_for(&city.slug);
                    debug!("Load #{} for {}: {} dishes", ticket, city.slug, dishes.len());
                    let _ = tx.send(Event::DishesLoaded { ticket, dishes });
                });
            }
            Command::PersistCity(slug) => {
                info!("Saving '{}' as last city", slug);
                self.selection.save(&slug);
            }
            Command::RequestLocation => {
                let tx = self.tx.clone();
                let provider = Arc::clone(&self.provider);
                tokio::spawn(async move {
                    let outcome = provider.request_location().await;
                    let _ = tx.send(Event::LocationUpdate(outcome));
                });
            }
        }
    }
}
