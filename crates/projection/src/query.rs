//! One-shot queries over the event store
//!
//! A [`Query`] folds the messages of its source streams into a state value.
//! Nothing is persisted: the state and positions live in the query object
//! and a later [`Query::run`] continues where the last one stopped.

use crate::engine::{EngineCore, StopHandle, StreamSource};
use crate::options::{QueryOptions, DEFAULT_CACHE_SIZE};
use crate::progress::{SharedProgress, StreamPositions};
use crate::status::ProjectionStatus;
use eventfile_core::{EventStore, Message, Result, StreamName, Value};
use std::sync::Arc;
use tracing::debug;

/// Handler registered with [`Query::when`] or [`Query::when_any`]
pub type QueryHandler =
    Box<dyn FnMut(&mut Value, &Message, &mut QueryContext<'_>) -> Result<()> + Send>;

/// What a query handler can see and do besides changing the state
#[derive(Debug)]
pub struct QueryContext<'a> {
    stream_name: &'a StreamName,
    stop: bool,
}

impl<'a> QueryContext<'a> {
    /// Stream the current message was loaded from
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    /// Stop the query after this message
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Query over one or more streams
pub struct Query {
    core: EngineCore<QueryHandler>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("status", &self.core.status)
            .field("positions", &self.core.positions)
            .finish_non_exhaustive()
    }
}

impl Query {
    /// Query reading through `store`
    pub fn new(store: Arc<dyn EventStore>, options: QueryOptions) -> Self {
        Self {
            core: EngineCore::new(
                store,
                SharedProgress::default(),
                DEFAULT_CACHE_SIZE,
                options.signal_dispatch,
            ),
        }
    }

    /// Set the initial state; may be called once
    pub fn init<F>(&mut self, init: F) -> Result<&mut Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.core.init(Box::new(init))?;
        Ok(self)
    }

    /// Read a single stream
    pub fn from_stream(&mut self, stream_name: impl Into<StreamName>) -> Result<&mut Self> {
        self.from_streams([stream_name])
    }

    /// Read the given streams
    pub fn from_streams<I, S>(&mut self, stream_names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<StreamName>,
    {
        let names = stream_names.into_iter().map(Into::into).collect();
        self.core.set_source(StreamSource::Streams(names))?;
        Ok(self)
    }

    /// Read every stream named `<category>-...`
    pub fn from_category(&mut self, category: &str) -> Result<&mut Self> {
        self.from_categories([category])
    }

    /// Read every stream of the given categories
    pub fn from_categories<'c>(
        &mut self,
        categories: impl IntoIterator<Item = &'c str>,
    ) -> Result<&mut Self> {
        let categories = categories.into_iter().map(str::to_string).collect();
        self.core.set_source(StreamSource::Categories(categories))?;
        Ok(self)
    }

    /// Read every stream except internal ones (names starting with `$`)
    pub fn from_all(&mut self) -> Result<&mut Self> {
        self.core.set_source(StreamSource::All)?;
        Ok(self)
    }

    /// Handle messages named `message_name`
    pub fn when<F>(&mut self, message_name: &str, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&mut Value, &Message, &mut QueryContext<'_>) -> Result<()> + Send + 'static,
    {
        self.core.when(message_name, Box::new(handler))?;
        Ok(self)
    }

    /// Handle every message
    pub fn when_any<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&mut Value, &Message, &mut QueryContext<'_>) -> Result<()> + Send + 'static,
    {
        self.core.when_any(Box::new(handler))?;
        Ok(self)
    }

    /// Process every source stream up to its current end
    ///
    /// # Errors
    ///
    /// `InvalidState` when no source or handler is configured, otherwise the
    /// first store or handler error. Messages handled before the error stay
    /// applied.
    pub fn run(&mut self) -> Result<()> {
        self.core.check_ready()?;
        self.core.clear_stop();
        self.core.status = ProjectionStatus::Running;

        let result = self.core.run_pass(None, |handler, state, stream_name, message| {
            let mut context = QueryContext {
                stream_name,
                stop: false,
            };
            handler(state, message, &mut context)?;
            Ok(context.stop)
        });

        self.core.status = ProjectionStatus::Idle;
        self.core.clear_stop();
        let processed = result?;
        debug!(target: "eventfile::projection", processed, "Query run finished");
        Ok(())
    }

    /// Forget positions and go back to the initial state
    pub fn reset(&mut self) {
        self.core.reset_progress();
    }

    /// Request a stop of the current run; a new run clears it
    pub fn stop(&mut self) {
        self.core.request_stop();
    }

    /// Handle for stopping the query from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.core.stop_handle()
    }

    /// Current state
    pub fn state(&self) -> &Value {
        &self.core.state
    }

    /// Last processed position per stream
    pub fn stream_positions(&self) -> &StreamPositions {
        &self.core.positions
    }

    /// Current status
    pub fn status(&self) -> ProjectionStatus {
        self.core.status
    }
}
