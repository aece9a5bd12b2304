use super::*;
use crate::engine::{EngineHandle, EngineMatch, EngineResult, ResultSink};
use crate::error::{ConfigError, EngineError};
use crate::types::Criterion;
use common::{ManualEngine, QUIET, TIMEOUT, collector, echo_registry, haystack, result};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

mod common {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::{Receiver, Sender};
    use std::time::Duration;

    pub(super) const TIMEOUT: Duration = Duration::from_secs(5);
    pub(super) const QUIET: Duration = Duration::from_millis(150);

    pub(super) fn haystack(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    pub(super) fn result(needle: &str, keys: &[&str]) -> EngineResult {
        EngineResult {
            needle: needle.to_string(),
            matches: keys
                .iter()
                .enumerate()
                .map(|(hay_index, key)| EngineMatch {
                    key: key.to_string(),
                    hay_index,
                    score: 1,
                    positions: vec![],
                })
                .collect(),
        }
    }

    pub(super) fn echo_registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(Arc::new(EchoEngine)))
    }

    /// Listener forwarding every result into a channel.
    pub(super) fn collector() -> (
        impl Fn(&SearchResult) + Send + Sync + 'static,
        Receiver<SearchResult>,
    ) {
        let (tx, rx) = mpsc::channel();
        let listener = move |result: &SearchResult| {
            let _ = tx.send(result.clone());
        };
        (listener, rx)
    }

    /// Answers each needle with the entries containing it as a substring.
    pub(super) struct EchoEngine;

    impl Engine for EchoEngine {
        fn create(
            &self,
            haystack: Vec<String>,
            _options: Options,
            sink: ResultSink,
        ) -> std::result::Result<Box<dyn EngineHandle>, EngineError> {
            let (tx, rx) = mpsc::channel::<Option<String>>();
            thread::spawn(move || {
                for command in rx {
                    let Some(needle) = command else {
                        break;
                    };
                    let matches = haystack
                        .iter()
                        .enumerate()
                        .filter_map(|(hay_index, key)| {
                            let start = key.find(&needle)?;
                            let offset = key[..start].chars().count() as u32;
                            let len = needle.chars().count() as u32;
                            Some(EngineMatch {
                                key: key.clone(),
                                hay_index,
                                score: len,
                                positions: (offset..offset + len).collect(),
                            })
                        })
                        .collect();
                    if !sink.send(EngineResult { needle, matches }) {
                        break;
                    }
                }
            });
            Ok(Box::new(EchoHandle { tx }))
        }
    }

    struct EchoHandle {
        tx: Sender<Option<String>>,
    }

    impl EngineHandle for EchoHandle {
        fn submit(&self, needle: &str) -> std::result::Result<(), EngineError> {
            self.tx
                .send(Some(needle.to_string()))
                .map_err(|_| EngineError::Closed)
        }

        fn terminate(&self) {
            let _ = self.tx.send(None);
        }
    }

    /// Records needles and leaves result production to the test.
    ///
    /// Sinks are retained, so the result stream stays open after `end`.
    #[derive(Default)]
    pub(super) struct ManualEngine {
        sinks: Mutex<Vec<ResultSink>>,
        needles: Arc<Mutex<Vec<String>>>,
        terminated: Arc<AtomicUsize>,
        fail_next: AtomicBool,
    }

    impl ManualEngine {
        pub(super) fn sink(&self, instance: usize) -> ResultSink {
            self.sinks.lock().unwrap()[instance].clone()
        }

        pub(super) fn needles(&self) -> Vec<String> {
            self.needles.lock().unwrap().clone()
        }

        pub(super) fn terminated(&self) -> usize {
            self.terminated.load(Ordering::SeqCst)
        }

        pub(super) fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }
    }

    impl Engine for ManualEngine {
        fn create(
            &self,
            _haystack: Vec<String>,
            _options: Options,
            sink: ResultSink,
        ) -> std::result::Result<Box<dyn EngineHandle>, EngineError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(EngineError::Closed);
            }
            self.sinks.lock().unwrap().push(sink);
            Ok(Box::new(ManualHandle {
                needles: self.needles.clone(),
                terminated: self.terminated.clone(),
            }))
        }
    }

    struct ManualHandle {
        needles: Arc<Mutex<Vec<String>>>,
        terminated: Arc<AtomicUsize>,
    }

    impl EngineHandle for ManualHandle {
        fn submit(&self, needle: &str) -> std::result::Result<(), EngineError> {
            self.needles.lock().unwrap().push(needle.to_string());
            Ok(())
        }

        fn terminate(&self) {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }
}

mod create {
    use super::*;

    #[test]
    fn test_create_returns_sequential_handles() {
        let registry = echo_registry();

        let first = registry.create(haystack(&["alpha"]), Options::default()).unwrap();
        let second = registry.create(haystack(&["beta"]), Options::default()).unwrap();

        assert_eq!(first, SessionId::new(0));
        assert_eq!(second, SessionId::new(1));
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_create_empty_haystack_rejected_before_allocation() {
        let registry = echo_registry();

        let err = registry.create(vec![], Options::default()).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::EmptyHaystack)
        ));

        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        assert_eq!(id, SessionId::new(0));
    }

    #[test]
    fn test_create_from_raw_rejects_bad_config_before_allocation() {
        let registry = echo_registry();
        let raw = RawOptions {
            sort: Some(vec![0, 7]),
            ..RawOptions::default()
        };

        let err = registry.create_from_raw(haystack(&["x"]), &raw).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Config(ConfigError::UnknownCriterion { position: 1, value: 7 })
        ));

        let id = registry
            .create_from_raw(haystack(&["x"]), &RawOptions::default())
            .unwrap();
        assert_eq!(id, SessionId::new(0));
    }

    #[test]
    fn test_create_keeps_translated_options() {
        let registry = echo_registry();
        let raw = RawOptions {
            sort: Some(vec![
                Criterion::ByScore.code(),
                Criterion::ByLength.code(),
            ]),
            ..RawOptions::default()
        };

        let id = registry.create_from_raw(haystack(&["x"]), &raw).unwrap();

        assert_eq!(
            registry.options(id).unwrap().sort,
            vec![Criterion::ByScore, Criterion::ByLength]
        );
    }

    #[test]
    fn test_engine_failure_tombstones_slot() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());

        engine.fail_next();
        let err = registry.create(haystack(&["x"]), Options::default()).unwrap_err();
        assert!(matches!(err, GatewayError::Engine(EngineError::Closed)));
        assert!(!registry.is_active(SessionId::new(0)));

        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        assert_eq!(id, SessionId::new(1));
        assert!(matches!(
            registry.end(SessionId::new(0)),
            Err(GatewayError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_concurrent_creates_yield_distinct_handles() {
        let registry = echo_registry();

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry
                        .create(vec![format!("entry{i}")], Options::default())
                        .unwrap()
                })
            })
            .collect();
        let ids: HashSet<SessionId> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let expected: HashSet<SessionId> = (0..8).map(SessionId::new).collect();
        assert_eq!(ids, expected);
        assert_eq!(registry.active_count(), 8);
    }
}

mod search {
    use super::*;

    #[test]
    fn test_search_delivers_translated_result() {
        let registry = echo_registry();
        let id = registry
            .create(haystack(&["alpha", "beta", "gamma"]), Options::default())
            .unwrap();
        let (listener, results) = collector();
        registry.add_listener(id, listener).unwrap();

        registry.search(id, "al").unwrap();

        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(id, SessionId::new(0));
        assert_eq!(result.needle, "al");
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].key, "alpha");
        assert_eq!(result.matches[0].hay_index, 0);
        assert_eq!(result.matches[0].positions, vec![0, 1]);
    }

    #[test]
    fn test_results_arrive_in_submission_order() {
        let registry = echo_registry();
        let id = registry
            .create(haystack(&["a", "ab", "abc"]), Options::default())
            .unwrap();
        let (listener, results) = collector();
        registry.add_listener(id, listener).unwrap();

        registry.search(id, "a").unwrap();
        registry.search(id, "ab").unwrap();

        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "a");
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "ab");
    }

    #[test]
    fn test_needles_forwarded_verbatim_in_order() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();

        for needle in ["a", "ab", " ab ", "!^'"] {
            registry.search(id, needle).unwrap();
        }

        assert_eq!(engine.needles(), ["a", "ab", " ab ", "!^'"]);
    }

    #[test]
    fn test_search_unknown_handle() {
        let registry = echo_registry();

        let err = registry.search(SessionId::new(3), "a").unwrap_err();

        assert!(matches!(err, GatewayError::InvalidHandle(id) if id == SessionId::new(3)));
    }

    #[test]
    fn test_search_after_end() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        registry.end(id).unwrap();

        let err = registry.search(id, "x").unwrap_err();

        assert!(matches!(err, GatewayError::InvalidHandle(_)));
    }
}

mod end {
    use super::*;

    #[test]
    fn test_end_twice_fails() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();

        registry.end(id).unwrap();
        let err = registry.end(id).unwrap_err();

        assert!(matches!(err, GatewayError::InvalidHandle(_)));
        assert!(!registry.is_active(id));
    }

    #[test]
    fn test_end_unknown_handle() {
        let registry = echo_registry();

        let err = registry.end(SessionId::new(0)).unwrap_err();

        assert!(matches!(err, GatewayError::InvalidHandle(_)));
    }

    #[test]
    fn test_handles_not_reused_after_end() {
        let registry = echo_registry();
        let first = registry.create(haystack(&["x"]), Options::default()).unwrap();
        registry.end(first).unwrap();

        let second = registry.create(haystack(&["x"]), Options::default()).unwrap();

        assert_ne!(first, second);
        assert!(!registry.is_active(first));
        assert!(registry.is_active(second));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_end_terminates_engine() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();

        registry.end(id).unwrap();

        assert_eq!(engine.terminated(), 1);
    }

    #[test]
    fn test_results_after_end_are_discarded() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let (listener, results) = collector();
        registry.add_listener(id, listener).unwrap();
        let sink = engine.sink(0);

        assert!(sink.send(result("before", &["x"])));
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "before");

        registry.end(id).unwrap();
        sink.send(result("after", &["x"]));

        assert!(results.recv_timeout(QUIET).is_err());
    }

    #[test]
    fn test_end_waits_for_listener_in_progress() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel();
        let flag = finished.clone();
        registry
            .add_listener(id, move |_: &SearchResult| {
                let _ = started_tx.send(());
                thread::sleep(QUIET * 2);
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            })
            .unwrap();

        registry.search(id, "x").unwrap();
        started_rx.recv_timeout(TIMEOUT).unwrap();
        registry.end(id).unwrap();

        assert!(finished.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_drop_registry_ends_active_sessions() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let first = registry.create(haystack(&["x"]), Options::default()).unwrap();
        registry.create(haystack(&["y"]), Options::default()).unwrap();
        registry.end(first).unwrap();

        drop(registry);

        assert_eq!(engine.terminated(), 2);
    }
}

mod listeners {
    use super::*;

    #[test]
    fn test_listeners_invoked_in_registration_order() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        for tag in ["first", "second", "third"] {
            let calls = calls.clone();
            let done_tx = done_tx.clone();
            registry
                .add_listener(id, move |_: &SearchResult| {
                    calls.lock().unwrap().push(tag);
                    if tag == "third" {
                        let _ = done_tx.send(());
                    }
                })
                .unwrap();
        }
        engine.sink(0).send(result("x", &["x"]));

        done_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(*calls.lock().unwrap(), ["first", "second", "third"]);
    }

    #[test]
    fn test_add_listener_after_end_rejected() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        registry.end(id).unwrap();
        let (listener, _results) = collector();

        let err = registry.add_listener(id, listener).unwrap_err();

        assert!(matches!(err, GatewayError::InvalidHandle(_)));
    }

    #[test]
    fn test_new_listener_sees_only_later_results() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let (early, early_results) = collector();
        registry.add_listener(id, early).unwrap();

        engine.sink(0).send(result("one", &["x"]));
        assert_eq!(early_results.recv_timeout(TIMEOUT).unwrap().needle, "one");

        let (late, late_results) = collector();
        registry.add_listener(id, late).unwrap();
        engine.sink(0).send(result("two", &["x"]));

        assert_eq!(late_results.recv_timeout(TIMEOUT).unwrap().needle, "two");
        assert_eq!(early_results.recv_timeout(TIMEOUT).unwrap().needle, "two");
    }

    #[test]
    fn test_listener_added_after_last_result_receives_nothing() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let (early, early_results) = collector();
        registry.add_listener(id, early).unwrap();
        registry.search(id, "x").unwrap();
        early_results.recv_timeout(TIMEOUT).unwrap();

        let (late, late_results) = collector();
        registry.add_listener(id, late).unwrap();
        registry.end(id).unwrap();

        assert!(late_results.recv_timeout(QUIET).is_err());
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let engine = Arc::new(ManualEngine::default());
        let registry = SessionRegistry::new(engine.clone());
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        registry
            .add_listener(id, |_: &SearchResult| panic!("listener failure"))
            .unwrap();
        let (listener, results) = collector();
        registry.add_listener(id, listener).unwrap();

        engine.sink(0).send(result("one", &["x"]));
        engine.sink(0).send(result("two", &["x"]));

        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "one");
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "two");
    }

    #[test]
    fn test_listener_can_search_from_callback() {
        let registry = echo_registry();
        let id = registry
            .create(haystack(&["alpha", "beta"]), Options::default())
            .unwrap();
        let reentrant = registry.clone();
        registry
            .add_listener(id, move |result: &SearchResult| {
                if result.needle == "a" {
                    reentrant.search(id, "al").unwrap();
                }
            })
            .unwrap();
        let (listener, results) = collector();
        registry.add_listener(id, listener).unwrap();

        registry.search(id, "a").unwrap();

        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "a");
        let follow_up = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(follow_up.needle, "al");
        assert_eq!(follow_up.matches[0].key, "alpha");

        registry.end(id).unwrap();
    }

    #[test]
    fn test_listener_can_end_its_own_session() {
        let registry = echo_registry();
        let id = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let reentrant = registry.clone();
        let (ended_tx, ended_rx) = mpsc::channel();
        registry
            .add_listener(id, move |_: &SearchResult| {
                let _ = ended_tx.send(reentrant.end(id).is_ok());
            })
            .unwrap();

        registry.search(id, "x").unwrap();

        assert!(ended_rx.recv_timeout(TIMEOUT).unwrap());
        assert!(!registry.is_active(id));
    }
}

mod isolation {
    use super::*;

    #[test]
    fn test_ending_one_session_leaves_other_running() {
        let registry = echo_registry();
        let first = registry
            .create(haystack(&["alpha", "beta"]), Options::default())
            .unwrap();
        let second = registry
            .create(haystack(&["gamma", "delta"]), Options::default())
            .unwrap();
        assert_ne!(first, second);
        let (listener, results) = collector();
        registry.add_listener(second, listener).unwrap();

        registry.end(first).unwrap();
        registry.search(second, "el").unwrap();

        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(result.needle, "el");
        assert_eq!(result.matches[0].key, "delta");
        assert!(registry.is_active(second));
    }

    #[test]
    fn test_blocked_listener_only_stalls_own_session() {
        let registry = echo_registry();
        let slow = registry.create(haystack(&["x"]), Options::default()).unwrap();
        let fast = registry.create(haystack(&["y"]), Options::default()).unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let (entered_tx, entered_rx) = mpsc::channel();
        registry
            .add_listener(slow, move |_: &SearchResult| {
                let _ = entered_tx.send(());
                let _ = release_rx.lock().unwrap().recv();
            })
            .unwrap();
        let (listener, results) = collector();
        registry.add_listener(fast, listener).unwrap();

        registry.search(slow, "x").unwrap();
        entered_rx.recv_timeout(TIMEOUT).unwrap();
        registry.search(fast, "y").unwrap();

        assert_eq!(results.recv_timeout(TIMEOUT).unwrap().needle, "y");
        release_tx.send(()).unwrap();
    }
}

mod handle {
    use super::*;

    #[test]
    fn test_session_handle_operations() {
        let registry = echo_registry();
        let session = registry
            .open(haystack(&["alpha", "beta", "gamma"]), Options::default())
            .unwrap();
        let (listener, results) = collector();
        session.add_listener(listener).unwrap();

        session.search("ga").unwrap();

        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(result.matches[0].key, "gamma");
        assert_eq!(result.matches[0].hay_index, 2);

        session.end().unwrap();
        assert!(matches!(
            session.end(),
            Err(GatewayError::InvalidHandle(id)) if id == session.id()
        ));
        assert!(session.search("ga").is_err());
    }
}
