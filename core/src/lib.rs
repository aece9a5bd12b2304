//! fzgate core: session orchestration over an asynchronous matching engine.
//!
//! # Design
//!
//! - A [`SessionRegistry`] owns a table of session slots. Handles are slot
//!   indexes: allocated in increasing order from 0 and never reused. Ending a
//!   session tombstones its slot.
//! - Each session owns one engine handle and one dispatch thread. The dispatch
//!   thread drains a single channel carrying engine results and the stop
//!   signal sent by `end`, and fans every result out to the session's
//!   listeners in registration order.
//! - The matching engine is opaque. It is reached through the [`Engine`] and
//!   [`EngineHandle`] traits and pushes results into a [`ResultSink`].
//!
//! # Caller responsibility
//!
//! Sessions are not reclaimed on a timer. A session that is never ended keeps
//! its engine worker and dispatch thread alive until the registry is dropped.

pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

pub use engine::{Engine, EngineHandle, EngineMatch, EngineResult, ResultSink};
pub use error::{ConfigError, EngineError, GatewayError, Result, ValidationError};
pub use registry::{Listener, SessionHandle, SessionRegistry};
pub use types::{
    CaseMode, Constants, Criterion, EngineSettings, GatewaySettings, Haystack, LoggingSettings,
    Match, Options, RawOptions, SearchResult, SessionId, SettingsError, expose_constants,
};
