//! The single connection slot shared by the supervisor and its background
//! tasks.
//!
//! Every mutation is tagged with the generation it was started under. Taking
//! the slot bumps the generation, so tasks and in-flight starts belonging to
//! an older generation can no longer touch it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use {
    botdeck_channels::GatewayConnection,
    tokio::task::JoinHandle,
};

use crate::status::ConnectionState;

/// The committed connection and everything spawned for it.
pub(crate) struct Active {
    pub generation: u64,
    pub connection: Arc<dyn GatewayConnection>,
    pub state: ConnectionState,
    pub application_id: Option<String>,
    pub tracker: Option<JoinHandle<()>>,
    pub dispatcher: Option<JoinHandle<()>>,
}

impl Active {
    /// Abort both background tasks.
    pub fn abort_tasks(&mut self) {
        for task in [self.tracker.take(), self.dispatcher.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

#[derive(Default)]
pub(crate) struct Slot {
    pub generation: u64,
    pub active: Option<Active>,
}

#[derive(Default)]
pub(crate) struct Registry {
    slot: RwLock<Slot>,
}

impl Registry {
    pub fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Read access that reports poisoning instead of recovering from it.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Slot>> {
        match self.slot.read() {
            Ok(guard) => Some(guard),
            Err(_) => None,
        }
    }

    /// Invalidate the current generation and take whatever was committed.
    pub fn take(&self) -> (u64, Option<Active>) {
        let mut slot = self.write();
        slot.generation += 1;
        (slot.generation, slot.active.take())
    }

    /// Take the committed connection only if it still belongs to `generation`.
    pub fn release(&self, generation: u64) -> Option<Active> {
        let mut slot = self.write();
        if slot.active.as_ref().is_some_and(|a| a.generation == generation) {
            slot.generation += 1;
            slot.active.take()
        } else {
            None
        }
    }

    /// Move `generation`'s connection to `state`. Returns the previous state
    /// when the transition applied.
    pub fn transition(&self, generation: u64, state: ConnectionState) -> Option<ConnectionState> {
        let mut slot = self.write();
        let active = slot.active.as_mut().filter(|a| a.generation == generation)?;
        let previous = active.state;
        active.state = state;
        Some(previous)
    }

    #[cfg(test)]
    pub fn poison(self: &Arc<Self>) {
        let registry = Arc::clone(self);
        let _ = std::thread::spawn(move || {
            let _guard = registry.slot.write();
            panic!("poisoning the registry");
        })
        .join();
    }
}
