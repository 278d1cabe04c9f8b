//! Persistent projections
//!
//! A [`Projector`] is a named query whose positions, state and status are
//! saved in the event store's projection data after every pass. A later
//! run, even in another process, resumes from the saved positions.
//!
//! Handlers can write back to the store: [`ProjectorContext::emit`] appends
//! to the stream named after the projection, [`ProjectorContext::link_to`]
//! to any stream. Streams are created on first write.
//!
//! Before each pass the projector looks at the status saved in the store.
//! Another party can set it to `stopping`, `resetting` or one of the
//! deleting statuses to steer a running projector.

use crate::engine::{EngineCore, StopHandle, StreamSource};
use crate::options::ProjectionOptions;
use crate::progress::{ProjectionProgress, SharedProgress, StreamPositions};
use crate::status::ProjectionStatus;
use eventfile_core::{Error, EventStore, Message, Result, Stream, StreamName, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handler registered with [`Projector::when`] or [`Projector::when_any`]
pub type ProjectorHandler =
    Box<dyn FnMut(&mut Value, &Message, &mut ProjectorContext<'_>) -> Result<()> + Send>;

/// What a projector handler can see and do besides changing the state
#[derive(Debug)]
pub struct ProjectorContext<'a> {
    projection_name: &'a str,
    emitted_stream: Option<&'a StreamName>,
    stream_name: &'a StreamName,
    stop: bool,
    outbox: Vec<(StreamName, Message)>,
}

impl<'a> ProjectorContext<'a> {
    /// Name of the running projection
    pub fn projection_name(&self) -> &str {
        self.projection_name
    }

    /// Stream the current message was loaded from
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    /// Stop the projection after this message
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// Append `message` to the stream named after the projection
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the projection name is empty.
    pub fn emit(&mut self, message: Message) -> Result<()> {
        let stream_name = self.emitted_stream.ok_or_else(|| {
            Error::InvalidArgument("Cannot emit from a projection with an empty name".to_string())
        })?;
        self.outbox.push((stream_name.clone(), message));
        Ok(())
    }

    /// Append `message` to `stream_name`
    pub fn link_to(&mut self, stream_name: impl Into<StreamName>, message: Message) {
        self.outbox.push((stream_name.into(), message));
    }
}

/// Write emitted messages, creating streams that do not exist yet
pub(crate) fn write_outbox(
    store: &dyn EventStore,
    outbox: Vec<(StreamName, Message)>,
) -> Result<()> {
    for (stream_name, message) in outbox {
        if store.has_stream(&stream_name) {
            store.append_to(&stream_name, vec![message])?;
        } else {
            store.create(Stream::new(stream_name, vec![message]))?;
        }
    }
    Ok(())
}

/// Named projection persisted in the event store
pub struct Projector {
    name: String,
    emitted_stream: Option<StreamName>,
    core: EngineCore<ProjectorHandler>,
    sleep: Duration,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("name", &self.name)
            .field("status", &self.core.status)
            .field("positions", &self.core.positions)
            .finish_non_exhaustive()
    }
}

impl Projector {
    /// Projection `name` reading through `store`
    ///
    /// `progress` receives the projector's status, positions and state
    /// whenever they are saved.
    pub fn new(
        store: Arc<dyn EventStore>,
        name: impl Into<String>,
        options: ProjectionOptions,
        progress: SharedProgress,
    ) -> Self {
        let name = name.into();
        Self {
            emitted_stream: StreamName::try_new(name.as_str()),
            name,
            core: EngineCore::new(
                store,
                progress,
                options.cache_size,
                options.signal_dispatch,
            ),
            sleep: options.sleep,
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

    /// Read every stream except internal ones
    pub fn from_all(&mut self) -> Result<&mut Self> {
        self.core.set_source(StreamSource::All)?;
        Ok(self)
    }

    /// Handle messages named `message_name`
    pub fn when<F>(&mut self, message_name: &str, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&mut Value, &Message, &mut ProjectorContext<'_>) -> Result<()> + Send + 'static,
    {
        self.core.when(message_name, Box::new(handler))?;
        Ok(self)
    }

    /// Handle every message
    pub fn when_any<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&mut Value, &Message, &mut ProjectorContext<'_>) -> Result<()> + Send + 'static,
    {
        self.core.when_any(Box::new(handler))?;
        Ok(self)
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Run the projection
    ///
    /// Resumes from the saved positions and state. With `keep_running`, the
    /// projector polls for new messages, sleeping between passes, until it
    /// is stopped; otherwise it returns after one pass.
    ///
    /// # Errors
    ///
    /// `InvalidState` when no source or handler is configured, otherwise the
    /// first store or handler error. Progress of completed passes stays
    /// saved.
    pub fn run(&mut self, keep_running: bool) -> Result<()> {
        self.core.check_ready()?;
        self.core.clear_stop();
        self.load()?;
        info!(target: "eventfile::projection", name = %self.name, keep_running, "Projection started");

        let result = self.run_loop(keep_running);
        self.core.clear_stop();
        if let Err(e) = &result {
            warn!(target: "eventfile::projection", name = %self.name, error = %e, "Projection failed");
        }
        result
    }

    fn run_loop(&mut self, keep_running: bool) -> Result<()> {
        loop {
            match self.remote_status() {
                ProjectionStatus::Stopping => {
                    return self.stop();
                }
                ProjectionStatus::Deleting => {
                    return self.delete(false);
                }
                ProjectionStatus::DeletingInclEmittedEvents => {
                    return self.delete(true);
                }
                ProjectionStatus::Resetting => {
                    self.reset()?;
                }
                ProjectionStatus::Idle | ProjectionStatus::Running => {}
            }

            self.core.status = ProjectionStatus::Running;
            self.persist()?;

            let store = Arc::clone(&self.core.store);
            let name = self.name.as_str();
            let emitted_stream = self.emitted_stream.as_ref();
            let processed = self.core.run_pass(None, |handler, state, stream_name, message| {
                let mut context = ProjectorContext {
                    projection_name: name,
                    emitted_stream,
                    stream_name,
                    stop: false,
                    outbox: Vec::new(),
                };
                handler(state, message, &mut context)?;
                write_outbox(store.as_ref(), context.outbox)?;
                Ok(context.stop)
            })?;
            debug!(target: "eventfile::projection", name = %self.name, processed, "Projection pass finished");

            if !keep_running || self.core.stop_requested() {
                break;
            }
            self.core.status = ProjectionStatus::Idle;
            self.persist()?;
            std::thread::sleep(self.sleep);
        }

        self.core.status = ProjectionStatus::Idle;
        self.persist()
    }

    fn remote_status(&self) -> ProjectionStatus {
        self.core
            .store
            .fetch_projection_data(&self.name)
            .and_then(|data| ProjectionProgress::stored_status(&data))
            .unwrap_or(ProjectionStatus::Idle)
    }

    /// Resume from saved progress, or save a fresh record
    fn load(&mut self) -> Result<()> {
        match self.core.store.fetch_projection_data(&self.name) {
            Some(data) => {
                let stored = ProjectionProgress::from_value(&data)?;
                self.core.restore(stored);
                self.core.publish();
                Ok(())
            }
            None => self.persist(),
        }
    }

    fn persist(&mut self) -> Result<()> {
        let data = self.core.to_progress().to_value();
        self.core.store.save_projection_data(&self.name, data)?;
        self.core.publish();
        Ok(())
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Stop the projection and save it as idle
    pub fn stop(&mut self) -> Result<()> {
        self.core.request_stop();
        self.core.status = ProjectionStatus::Idle;
        self.persist()?;
        info!(target: "eventfile::projection", name = %self.name, "Projection stopped");
        Ok(())
    }

    /// Forget positions, go back to the initial state and drop emitted
    /// messages
    pub fn reset(&mut self) -> Result<()> {
        self.core.reset_progress();
        self.delete_emitted_stream()?;
        self.persist()?;
        info!(target: "eventfile::projection", name = %self.name, "Projection reset");
        Ok(())
    }

    /// Remove the saved projection data, and the emitted stream if asked
    pub fn delete(&mut self, delete_emitted_events: bool) -> Result<()> {
        if self.core.store.fetch_projection_data(&self.name).is_some() {
            self.core.store.delete_projection_data(&self.name)?;
        }
        if delete_emitted_events {
            self.delete_emitted_stream()?;
        }
        self.core.request_stop();
        self.core.reset_progress();
        self.core.status = ProjectionStatus::Idle;
        self.core.publish();
        info!(
            target: "eventfile::projection",
            name = %self.name,
            delete_emitted_events,
            "Projection deleted"
        );
        Ok(())
    }

    fn delete_emitted_stream(&self) -> Result<()> {
        match &self.emitted_stream {
            Some(emitted) if self.core.store.has_stream(emitted) => self.core.store.delete(emitted),
            _ => Ok(()),
        }
    }

    /// Handle for stopping the projection from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.core.stop_handle()
    }

    /// Projection name
    pub fn name(&self) -> &str {
        &self.name
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
