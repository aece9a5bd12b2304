pub(crate) mod index;
mod query;

use fzgate_core::{Engine, EngineError, EngineHandle, EngineSettings, Options, ResultSink};
use index::Index;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Engine spawning one matcher worker per session.
#[derive(Debug, Clone, Default)]
pub struct NucleoEngine {
    settings: EngineSettings,
}

impl NucleoEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl Engine for NucleoEngine {
    fn create(
        &self,
        haystack: Vec<String>,
        options: Options,
        sink: ResultSink,
    ) -> Result<Box<dyn EngineHandle>, EngineError> {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let index = Index::new(haystack, options, self.settings.result_limit);

        thread::Builder::new()
            .name("fzgate-engine".to_string())
            .spawn(move || worker_loop(index, request_rx, sink))?;

        Ok(Box::new(NucleoHandle {
            requests: request_tx,
        }))
    }
}

enum Request {
    Search { needle: String },
    Terminate,
}

struct NucleoHandle {
    requests: Sender<Request>,
}

impl EngineHandle for NucleoHandle {
    fn submit(&self, needle: &str) -> Result<(), EngineError> {
        self.requests
            .send(Request::Search {
                needle: needle.to_string(),
            })
            .map_err(|_| EngineError::Closed)
    }

    fn terminate(&self) {
        let _ = self.requests.send(Request::Terminate);
    }
}

fn worker_loop(mut index: Index, requests: Receiver<Request>, sink: ResultSink) {
    for request in requests {
        match request {
            Request::Search { needle } => {
                let started = Instant::now();
                let result = index.search(&needle);
                debug!(
                    needle = %needle,
                    matches = result.matches.len(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Search finished."
                );
                if !sink.send(result) {
                    break;
                }
            }
            Request::Terminate => break,
        }
    }
}
