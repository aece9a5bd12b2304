//! Boundary to the matching engine.
//!
//! The registry never looks inside the engine. It creates one engine instance
//! per session, forwards needles to it, terminates it on `end`, and receives
//! results through the [`ResultSink`] handed over at creation.

use crate::error::EngineError;
use crate::types::Options;
use std::sync::mpsc::Sender;

/// Factory for per-session engine instances.
pub trait Engine: Send + Sync {
    /// Starts matching over `haystack`.
    ///
    /// Results for submitted needles go to `sink`. The result stream closes
    /// once the engine drops every clone of the sink, which it must do after
    /// [`EngineHandle::terminate`].
    fn create(
        &self,
        haystack: Vec<String>,
        options: Options,
        sink: ResultSink,
    ) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// Control side of one engine instance.
pub trait EngineHandle: Send + Sync {
    /// Queues a needle. Must not block on the search itself.
    fn submit(&self, needle: &str) -> Result<(), EngineError>;

    /// Requests shutdown. The engine may still emit briefly afterwards.
    fn terminate(&self);
}

/// Result as produced by the engine, before translation for hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    pub needle: String,
    pub matches: Vec<EngineMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMatch {
    pub key: String,
    pub hay_index: usize,
    pub score: u32,
    /// Char offsets into `key`.
    pub positions: Vec<u32>,
}

/// Message consumed by a session's dispatch thread.
pub(crate) enum DispatchEvent {
    Result(EngineResult),
    Stop,
}

/// Producer end of a session's result stream.
#[derive(Clone)]
pub struct ResultSink {
    tx: Sender<DispatchEvent>,
}

impl ResultSink {
    pub(crate) fn new(tx: Sender<DispatchEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the session's dispatcher is gone.
    pub fn send(&self, result: EngineResult) -> bool {
        self.tx.send(DispatchEvent::Result(result)).is_ok()
    }
}
