use crate::status::FzStatus;
use fzgate_core::{GatewaySettings, RawOptions, SessionId, SessionRegistry};
use fzgate_search::NucleoEngine;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Start time is unset while zero.
const UNSET: i64 = 0;

/// Gateway owned by the host through an opaque pointer.
pub struct FzGateway {
    registry: SessionRegistry,
    started_at_ms: AtomicI64,
}

impl FzGateway {
    pub(crate) fn new(settings: &GatewaySettings) -> Self {
        let engine = NucleoEngine::new(settings.engine);
        Self {
            registry: SessionRegistry::new(Arc::new(engine)),
            started_at_ms: AtomicI64::new(UNSET),
        }
    }

    pub(crate) fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Decodes the host payloads and creates a session.
    ///
    /// Payload shape problems are usage errors. Option values the translator
    /// rejects are config errors.
    pub(crate) fn create_session(
        &self,
        haystack_json: &str,
        options_json: Option<&str>,
    ) -> Result<SessionId, FzStatus> {
        self.mark("create_start");

        let haystack: Vec<String> = serde_json::from_str(haystack_json).map_err(|err| {
            warn!(error = %err, "Haystack is not a JSON array of strings.");
            FzStatus::Usage
        })?;
        let value = match options_json {
            Some(text) => serde_json::from_str(text).map_err(|err| {
                warn!(error = %err, "Options are not valid JSON.");
                FzStatus::Usage
            })?,
            None => Value::Null,
        };
        let raw = RawOptions::from_value(value).map_err(|err| {
            warn!(error = %err, "Options rejected.");
            FzStatus::Config
        })?;
        self.mark("create_parsed");

        let id = self
            .registry
            .create_from_raw(haystack, &raw)
            .map_err(|err| FzStatus::from(&err))?;
        self.mark("create_done");
        Ok(id)
    }

    pub(crate) fn set_start_time(&self, unix_ms: i64) {
        self.started_at_ms.store(unix_ms, Ordering::Relaxed);
    }

    /// Logs the time elapsed since the host's start time, if one was set.
    fn mark(&self, milestone: &'static str) {
        let started = self.started_at_ms.load(Ordering::Relaxed);
        if started == UNSET {
            return;
        }
        let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) else {
            return;
        };
        let elapsed_ms = now.as_millis() as i64 - started;
        debug!(milestone, elapsed_ms, "Latency.");
    }
}
