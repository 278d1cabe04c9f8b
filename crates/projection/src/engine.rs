//! Shared machinery of the query and projector engines
//!
//! An engine reads a set of streams in order, remembers the last processed
//! position of each stream, and feeds every message to the handler
//! registered for its name (or to a catch-all handler).
//!
//! Streams are processed one after another, each from its last position to
//! its current end. Streams that disappear between passes are skipped.

use crate::progress::{ProjectionProgress, SharedProgress, StreamPositions};
use crate::status::ProjectionStatus;
use eventfile_core::{Error, EventStore, Message, Result, StreamName, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where an engine reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamSource {
    Streams(Vec<StreamName>),
    Categories(Vec<String>),
    All,
}

pub(crate) enum Handlers<H> {
    Named(BTreeMap<String, H>),
    Any(H),
}

type InitFn = Box<dyn Fn() -> Value + Send + Sync>;

/// Requests a running engine to stop, from any thread
///
/// A handler can always stop its engine through its context. A stop handle
/// is checked between streams and polls, and also between events when the
/// engine was created with `signal_dispatch`.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the engine to stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub(crate) struct EngineCore<H> {
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) state: Value,
    pub(crate) positions: StreamPositions,
    pub(crate) status: ProjectionStatus,
    init: Option<InitFn>,
    source: Option<StreamSource>,
    handlers: Option<Handlers<H>>,
    stop: StopHandle,
    stop_now: bool,
    cache_size: usize,
    signal_dispatch: bool,
    progress: SharedProgress,
}

impl<H> EngineCore<H> {
    pub(crate) fn new(
        store: Arc<dyn EventStore>,
        progress: SharedProgress,
        cache_size: usize,
        signal_dispatch: bool,
    ) -> Self {
        Self {
            store,
            state: Value::object(),
            positions: StreamPositions::new(),
            status: ProjectionStatus::Idle,
            init: None,
            source: None,
            handlers: None,
            stop: StopHandle::default(),
            stop_now: false,
            cache_size,
            signal_dispatch,
            progress,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub(crate) fn init(&mut self, init: InitFn) -> Result<()> {
        if self.init.is_some() {
            return Err(Error::invalid_state("Projection already initialized"));
        }
        self.state = init();
        self.init = Some(init);
        Ok(())
    }

    pub(crate) fn set_source(&mut self, source: StreamSource) -> Result<()> {
        if self.source.is_some() {
            return Err(Error::invalid_state("From was already called"));
        }
        self.source = Some(source);
        Ok(())
    }

    pub(crate) fn when(&mut self, message_name: &str, handler: H) -> Result<()> {
        match &mut self.handlers {
            None => {
                let mut named = BTreeMap::new();
                named.insert(message_name.to_string(), handler);
                self.handlers = Some(Handlers::Named(named));
                Ok(())
            }
            Some(Handlers::Named(named)) => {
                if named.contains_key(message_name) {
                    return Err(Error::invalid_state(format!(
                        "A handler for \"{}\" is already registered",
                        message_name
                    )));
                }
                named.insert(message_name.to_string(), handler);
                Ok(())
            }
            Some(Handlers::Any(_)) => Err(Error::invalid_state("When was already called")),
        }
    }

    pub(crate) fn when_any(&mut self, handler: H) -> Result<()> {
        if self.handlers.is_some() {
            return Err(Error::invalid_state("When was already called"));
        }
        self.handlers = Some(Handlers::Any(handler));
        Ok(())
    }

    pub(crate) fn check_ready(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::invalid_state("No streams configured"));
        }
        if self.handlers.is_none() {
            return Err(Error::invalid_state("No handlers configured"));
        }
        Ok(())
    }

    // ========================================================================
    // State
    // ========================================================================

    pub(crate) fn initial_state(&self) -> Value {
        self.init.as_ref().map(|init| init()).unwrap_or_else(Value::object)
    }

    pub(crate) fn reset_progress(&mut self) {
        self.positions.clear();
        self.state = self.initial_state();
    }

    pub(crate) fn restore(&mut self, stored: ProjectionProgress) {
        self.positions = stored.positions;
        self.state = stored.state;
    }

    pub(crate) fn to_progress(&self) -> ProjectionProgress {
        ProjectionProgress {
            status: self.status,
            positions: self.positions.clone(),
            state: self.state.clone(),
        }
    }

    /// Copy status, positions and state into the shared progress
    pub(crate) fn publish(&self) {
        *self.progress.write() = self.to_progress();
    }

    // ========================================================================
    // Stopping
    // ========================================================================

    pub(crate) fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop.stop();
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_now || self.stop.is_stopped()
    }

    pub(crate) fn clear_stop(&mut self) {
        self.stop_now = false;
        self.stop.clear();
    }

    fn should_stop(&self, between_events: bool) -> bool {
        self.stop_now || (self.stop.is_stopped() && (self.signal_dispatch || !between_events))
    }

    // ========================================================================
    // Processing
    // ========================================================================

    fn stream_names(&self) -> Result<Vec<StreamName>> {
        match &self.source {
            None => Ok(Vec::new()),
            Some(StreamSource::Streams(names)) => Ok(names.clone()),
            Some(StreamSource::Categories(categories)) => {
                let mut names = Vec::new();
                for category in categories {
                    let pattern = format!("^{}-", regex::escape(category));
                    names.extend(self.fetch_all_pages(|limit, offset| {
                        self.store
                            .fetch_stream_names_regex(&pattern, None, limit, offset)
                    })?);
                }
                Ok(names)
            }
            Some(StreamSource::All) => Ok(self
                .fetch_all_pages(|limit, offset| {
                    self.store.fetch_stream_names(None, None, limit, offset)
                })?
                .into_iter()
                .filter(|name| !name.is_internal())
                .collect()),
        }
    }

    fn fetch_all_pages(
        &self,
        fetch: impl Fn(usize, usize) -> Result<Vec<StreamName>>,
    ) -> Result<Vec<StreamName>> {
        let mut names = Vec::new();
        loop {
            let page = fetch(self.cache_size, names.len())?;
            let fetched = page.len();
            names.extend(page);
            if fetched < self.cache_size {
                return Ok(names);
            }
        }
    }

    /// Track every source stream, starting new ones at position 0
    fn prepare_positions(&mut self) -> Result<()> {
        for name in self.stream_names()? {
            self.positions.entry(name.to_string()).or_insert(0);
        }
        Ok(())
    }

    /// Process every stream up to its current end
    ///
    /// `apply` is called with the matching handler for each message and
    /// returns whether the handler asked to stop. With a `limit`, the pass
    /// returns after that many messages. Returns the number of messages
    /// processed, including those without a handler.
    pub(crate) fn run_pass<F>(&mut self, limit: Option<usize>, mut apply: F) -> Result<usize>
    where
        F: FnMut(&mut H, &mut Value, &StreamName, &Message) -> Result<bool>,
    {
        self.prepare_positions()?;
        let streams: Vec<String> = self.positions.keys().cloned().collect();
        let mut processed = 0;

        for stream in streams {
            if self.should_stop(false) || limit == Some(processed) {
                break;
            }
            let Some(name) = StreamName::try_new(stream.as_str()) else {
                continue;
            };
            let from = self.positions.get(&stream).copied().unwrap_or(0) + 1;
            let messages = match self.store.load(&name, from, None, None) {
                Ok(messages) => messages,
                Err(Error::StreamNotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            for message in messages {
                let handler = match self.handlers.as_mut() {
                    Some(Handlers::Any(handler)) => Some(handler),
                    Some(Handlers::Named(named)) => named.get_mut(message.message_name()),
                    None => None,
                };
                if let Some(handler) = handler {
                    if apply(handler, &mut self.state, &name, &message)? {
                        self.stop_now = true;
                    }
                }
                if let Some(position) = self.positions.get_mut(&stream) {
                    *position += 1;
                }
                processed += 1;

                if self.should_stop(true) || limit == Some(processed) {
                    break;
                }
            }
        }
        Ok(processed)
    }
}
