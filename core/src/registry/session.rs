//! One search session and its dispatch thread.

use crate::engine::{DispatchEvent, Engine, EngineHandle, ResultSink};
use crate::error::EngineError;
use crate::types::{Haystack, Options, SearchResult, SessionId};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::{debug, error, trace};

/// Callback receiving every result of the session it is registered on.
///
/// Runs on the session's dispatch thread. It may call back into the registry.
/// Once `end` returns on another thread, no listener call of that session is
/// running or will start.
pub type Listener = Arc<dyn Fn(&SearchResult) + Send + Sync>;

pub(crate) struct Session {
    id: SessionId,
    options: Options,
    engine: Box<dyn EngineHandle>,
    listeners: Arc<RwLock<Vec<Listener>>>,
    stopped: Arc<AtomicBool>,
    /// Held by the dispatcher for each listener call.
    delivery: Arc<Mutex<()>>,
    dispatch_thread: ThreadId,
    /// Taken by `shutdown`; the dispatcher exits once this and every sink are dropped.
    control: Mutex<Option<Sender<DispatchEvent>>>,
}

impl Session {
    /// Spawns the dispatch thread, then the engine instance feeding it.
    pub(crate) fn start(
        id: SessionId,
        haystack: Haystack,
        options: Options,
        engine: &dyn Engine,
    ) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel();
        let listeners = Arc::new(RwLock::new(Vec::new()));
        let stopped = Arc::new(AtomicBool::new(false));
        let delivery = Arc::new(Mutex::new(()));

        let dispatcher = Dispatcher {
            id,
            listeners: listeners.clone(),
            stopped: stopped.clone(),
            delivery: delivery.clone(),
        };
        let dispatch_thread = thread::Builder::new()
            .name(format!("fzgate-dispatch-{id}"))
            .spawn(move || dispatcher.run(rx))?
            .thread()
            .id();

        // On failure every sender is dropped here, so the dispatcher exits.
        let engine = engine.create(
            haystack.into_inner(),
            options.clone(),
            ResultSink::new(tx.clone()),
        )?;

        Ok(Self {
            id,
            options,
            engine,
            listeners,
            stopped,
            delivery,
            dispatch_thread,
            control: Mutex::new(Some(tx)),
        })
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn add_listener(&self, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub(crate) fn submit(&self, needle: &str) -> Result<(), EngineError> {
        debug!(session = %self.id, needle, "Submitting needle.");
        self.engine.submit(needle)
    }

    /// Stops delivery, then asks the engine to terminate.
    ///
    /// Off the dispatch thread this waits for a listener call in progress.
    /// From a listener of this session it returns without waiting.
    pub(crate) fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
        if thread::current().id() != self.dispatch_thread {
            drop(self.delivery.lock().unwrap_or_else(PoisonError::into_inner));
        }
        let control = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(control) = control {
            let _ = control.send(DispatchEvent::Stop);
        }
        self.engine.terminate();
    }
}

struct Dispatcher {
    id: SessionId,
    listeners: Arc<RwLock<Vec<Listener>>>,
    stopped: Arc<AtomicBool>,
    delivery: Arc<Mutex<()>>,
}

impl Dispatcher {
    fn run(self, events: Receiver<DispatchEvent>) {
        let mut discarded = 0usize;

        for event in events {
            match event {
                DispatchEvent::Stop => {
                    debug!(session = %self.id, "Stop received; draining engine output.");
                }
                DispatchEvent::Result(_) if self.is_stopped() => {
                    discarded += 1;
                    trace!(session = %self.id, "Discarding result produced after end.");
                }
                DispatchEvent::Result(result) => self.deliver(SearchResult::from(result)),
            }
        }

        debug!(session = %self.id, discarded, "Dispatcher exited.");
    }

    fn deliver(&self, result: SearchResult) {
        // Snapshot so listeners can register more listeners without deadlocking.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in &listeners {
            let _delivering = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
            if self.is_stopped() {
                return;
            }
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&result))).is_err() {
                error!(session = %self.id, needle = %result.needle, "Listener panicked.");
            }
        }

        debug!(
            session = %self.id,
            needle = %result.needle,
            matches = result.matches.len(),
            listeners = listeners.len(),
            "Result delivered."
        );
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
