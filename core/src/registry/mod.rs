//! Handle table of search sessions.

mod session;

use crate::engine::Engine;
use crate::error::{GatewayError, Result, ValidationError};
use crate::types::{Haystack, Options, RawOptions, SearchResult, SessionId};
use session::Session;
use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

pub use session::Listener;

enum Slot {
    /// Handle allocated, engine still starting.
    Reserved,
    Active(Arc<Session>),
    /// Tombstone. The handle is never handed out again.
    Ended,
}

/// Owns every session created through it.
///
/// Calls may come from any thread, including from listeners running on a
/// session's dispatch thread. No lock is held while a listener runs or while
/// an engine starts.
///
/// Sessions must be ended by the caller. Until then each one keeps an engine
/// worker and a dispatch thread alive; dropping the registry ends whatever is
/// still active.
pub struct SessionRegistry {
    engine: Arc<dyn Engine>,
    slots: RwLock<Vec<Slot>>,
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            slots: RwLock::new(Vec::new()),
        }
    }
}

/// Lifecycle operations.
impl SessionRegistry {
    /// Creates a session and returns its handle.
    ///
    /// Fails with [`ValidationError::EmptyHaystack`] before allocating anything
    /// if `haystack` is empty.
    pub fn create(&self, haystack: Vec<String>, options: Options) -> Result<SessionId> {
        let haystack =
            Haystack::try_new(haystack).map_err(|_| ValidationError::EmptyHaystack)?;
        let entries = haystack.as_ref().len();

        let id = self.reserve();
        match Session::start(id, haystack, options, self.engine.as_ref()) {
            Ok(session) => {
                self.set_slot(id, Slot::Active(Arc::new(session)));
                info!(session = %id, entries, "Session created.");
                Ok(id)
            }
            Err(err) => {
                self.set_slot(id, Slot::Ended);
                warn!(session = %id, error = %err, "Engine failed to start.");
                Err(err.into())
            }
        }
    }

    /// Translates `raw` and creates a session. Config errors reject the call
    /// before anything is allocated.
    pub fn create_from_raw(&self, haystack: Vec<String>, raw: &RawOptions) -> Result<SessionId> {
        let options = raw.translate()?;
        self.create(haystack, options)
    }

    /// Ends a session. A second `end` on the same handle is an error.
    pub fn end(&self, id: SessionId) -> Result<()> {
        let session = {
            let index = id.slot().ok_or(GatewayError::InvalidHandle(id))?;
            let mut slots = self.slots_mut();
            let slot = slots
                .get_mut(index)
                .ok_or(GatewayError::InvalidHandle(id))?;

            match mem::replace(slot, Slot::Ended) {
                Slot::Active(session) => session,
                previous => {
                    *slot = previous;
                    return Err(GatewayError::InvalidHandle(id));
                }
            }
        };

        session.shutdown();
        info!(session = %id, "Session ended.");
        Ok(())
    }
}

/// Per-session operations.
impl SessionRegistry {
    /// Forwards `needle` verbatim to the session's engine.
    pub fn search(&self, id: SessionId, needle: &str) -> Result<()> {
        self.active(id)?.submit(needle)?;
        Ok(())
    }

    /// Appends a listener. It only sees results delivered after this call.
    pub fn add_listener<F>(&self, id: SessionId, listener: F) -> Result<()>
    where
        F: Fn(&SearchResult) + Send + Sync + 'static,
    {
        self.active(id)?.add_listener(Arc::new(listener));
        Ok(())
    }

    /// Returns the translated options the session was created with.
    pub fn options(&self, id: SessionId) -> Result<Options> {
        Ok(self.active(id)?.options().clone())
    }
}

/// Introspection.
impl SessionRegistry {
    pub fn is_active(&self, id: SessionId) -> bool {
        self.active(id).is_ok()
    }

    pub fn active_count(&self) -> usize {
        self.slots()
            .iter()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }
}

/// Bound-handle API.
impl SessionRegistry {
    /// Creates a session and returns a handle bundling its operations.
    pub fn open(self: &Arc<Self>, haystack: Vec<String>, options: Options) -> Result<SessionHandle> {
        let id = self.create(haystack, options)?;
        Ok(SessionHandle {
            registry: self.clone(),
            id,
        })
    }
}

impl SessionRegistry {
    fn reserve(&self) -> SessionId {
        let mut slots = self.slots_mut();
        let id = SessionId::new(slots.len() as u64);
        slots.push(Slot::Reserved);
        id
    }

    fn set_slot(&self, id: SessionId, slot: Slot) {
        let Some(index) = id.slot() else {
            return;
        };
        if let Some(existing) = self.slots_mut().get_mut(index) {
            *existing = slot;
        }
    }

    fn active(&self, id: SessionId) -> Result<Arc<Session>> {
        let slots = self.slots();
        match id.slot().and_then(|index| slots.get(index)) {
            Some(Slot::Active(session)) => Ok(session.clone()),
            _ => Err(GatewayError::InvalidHandle(id)),
        }
    }

    fn slots(&self) -> RwLockReadGuard<'_, Vec<Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots_mut(&self) -> RwLockWriteGuard<'_, Vec<Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter_mut() {
            if let Slot::Active(session) = mem::replace(slot, Slot::Ended) {
                session.shutdown();
            }
        }
    }
}

/// A session bound to its registry.
///
/// Operations behave exactly like the registry calls with this handle's id.
#[derive(Clone)]
pub struct SessionHandle {
    registry: Arc<SessionRegistry>,
    id: SessionId,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn add_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&SearchResult) + Send + Sync + 'static,
    {
        self.registry.add_listener(self.id, listener)
    }

    pub fn search(&self, needle: &str) -> Result<()> {
        self.registry.search(self.id, needle)
    }

    pub fn end(&self) -> Result<()> {
        self.registry.end(self.id)
    }
}

#[cfg(test)]
mod tests;
