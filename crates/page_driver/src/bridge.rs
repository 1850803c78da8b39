//! Change-Notification Bridge: polluje `ChangeSource` a rozesílá dávky
//! nově připojených elementů všem subsystémům (broadcast).

use crate::{ChangeSource, ElementId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type AddedBatch = Arc<Vec<ElementId>>;

const CHANNEL_CAPACITY: usize = 256;

pub struct ChangeBridge {
    tx: broadcast::Sender<AddedBatch>,
    task: JoinHandle<()>,
}

impl ChangeBridge {
    pub fn spawn(source: Arc<dyn ChangeSource>, root_selector: &str, every: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let sender = tx.clone();
        let root = root_selector.to_string();

        let task = tokio::spawn(async move {
            let mut observing = false;
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                if !observing {
                    match source.observe(&root) {
                        Ok(()) => observing = true,
                        Err(e) => {
                            debug!("observe({}) failed, retrying: {}", root, e);
                            continue;
                        }
                    }
                }
                match source.take_added() {
                    Ok(added) if !added.is_empty() => {
                        // Bez odběratelů to selže, to je v pořádku
                        let _ = sender.send(Arc::new(added));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Change bridge poll failed: {}", e);
                        observing = false;
                    }
                }
            }
        });

        Self { tx, task }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AddedBatch> {
        self.tx.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<AddedBatch> {
        self.tx.clone()
    }
}

impl Drop for ChangeBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
