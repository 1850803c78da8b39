//! Odložené callbacky se zrušitelným handle.
//!
//! Každý naplánovaný event je samostatný tokio task (sleep + send).
//! Doručené eventy chodí do jednoho kanálu, takže je vlastník zpracuje
//! sekvenčně na svém vlákně. Drop scheduleru zruší všechno, co čeká.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
pub struct Fired<E> {
    pub handle: TaskHandle,
    pub event: E,
}

pub struct Scheduler<E> {
    next_id: u64,
    pending: HashMap<TaskHandle, AbortHandle>,
    tx: mpsc::UnboundedSender<Fired<E>>,
}

impl<E: Send + 'static> Scheduler<E> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_id: 0,
            pending: HashMap::new(),
            tx,
        };
        (scheduler, rx)
    }

    pub fn schedule(&mut self, delay: Duration, event: E) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Fired { handle, event });
        });
        self.pending.insert(handle, task.abort_handle());
        handle
    }

    /// Vrací false, pokud handle už neběží
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.pending.remove(&handle) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Volá vlastník po doručení eventu. False = handle byl mezitím zrušen
    /// (event už byl v kanálu) a event se má zahodit.
    pub fn complete(&mut self, handle: TaskHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }

    pub fn cancel_all(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<E> Drop for Scheduler<E> {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}
