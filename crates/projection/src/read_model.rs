//! Projections that feed a read model
//!
//! A [`ReadModelProjector`] works like a [`Projector`](crate::Projector),
//! but its handlers write into a [`ReadModel`] instead of emitting
//! messages. The read model buffers changes and writes them out on
//! [`ReadModel::persist`], which the projector calls every
//! `persist_block_size` messages and at the end of each pass.

use crate::engine::{EngineCore, StopHandle, StreamSource};
use crate::options::ReadModelProjectionOptions;
use crate::progress::{ProjectionProgress, SharedProgress, StreamPositions};
use crate::status::ProjectionStatus;
use eventfile_core::{EventStore, Message, Result, StreamName, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Target of a read model projection
pub trait ReadModel: Send {
    /// Prepare storage (tables, files, ...)
    fn init(&mut self) -> Result<()>;

    /// Whether storage is prepared
    fn is_initialized(&self) -> bool;

    /// Drop all data but keep storage prepared
    fn reset(&mut self) -> Result<()>;

    /// Remove storage entirely
    fn delete(&mut self) -> Result<()>;

    /// Write buffered changes out
    fn persist(&mut self) -> Result<()>;
}

/// Handler registered with [`ReadModelProjector::when`] or
/// [`ReadModelProjector::when_any`]
pub type ReadModelHandler<R> =
    Box<dyn FnMut(&mut Value, &Message, &mut ReadModelContext<'_, R>) -> Result<()> + Send>;

/// What a read model handler can see and do besides changing the state
#[derive(Debug)]
pub struct ReadModelContext<'a, R> {
    stream_name: &'a StreamName,
    read_model: &'a mut R,
    stop: bool,
}

impl<'a, R> ReadModelContext<'a, R> {
    /// Stream the current message was loaded from
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    /// Read model being fed
    pub fn read_model(&mut self) -> &mut R {
        self.read_model
    }

    /// Stop the projection after this message
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Named projection writing into a read model
pub struct ReadModelProjector<R: ReadModel + 'static> {
    name: String,
    read_model: R,
    core: EngineCore<ReadModelHandler<R>>,
    sleep: Duration,
    persist_block_size: usize,
}

impl<R: ReadModel + 'static> std::fmt::Debug for ReadModelProjector<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadModelProjector")
            .field("name", &self.name)
            .field("status", &self.core.status)
            .field("positions", &self.core.positions)
            .finish_non_exhaustive()
    }
}

impl<R: ReadModel + 'static> ReadModelProjector<R> {
    /// Projection `name` feeding `read_model` from `store`
    pub fn new(
        store: Arc<dyn EventStore>,
        name: impl Into<String>,
        read_model: R,
        options: ReadModelProjectionOptions,
        progress: SharedProgress,
    ) -> Self {
        Self {
            name: name.into(),
            read_model,
            core: EngineCore::new(
                store,
                progress,
                options.projection.cache_size,
                options.projection.signal_dispatch,
            ),
            sleep: options.projection.sleep,
            persist_block_size: options.persist_block_size.max(1),
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
        F: FnMut(&mut Value, &Message, &mut ReadModelContext<'_, R>) -> Result<()>
            + Send
            + 'static,
    {
        self.core.when(message_name, Box::new(handler))?;
        Ok(self)
    }

    /// Handle every message
    pub fn when_any<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&mut Value, &Message, &mut ReadModelContext<'_, R>) -> Result<()>
            + Send
            + 'static,
    {
        self.core.when_any(Box::new(handler))?;
        Ok(self)
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Run the projection
    ///
    /// Prepares the read model if needed, then behaves like
    /// [`Projector::run`](crate::Projector::run).
    pub fn run(&mut self, keep_running: bool) -> Result<()> {
        self.core.check_ready()?;
        self.core.clear_stop();
        if !self.read_model.is_initialized() {
            self.read_model.init()?;
        }
        self.load()?;
        info!(target: "eventfile::projection", name = %self.name, keep_running, "Read model projection started");

        let result = self.run_loop(keep_running);
        self.core.clear_stop();
        if let Err(e) = &result {
            warn!(target: "eventfile::projection", name = %self.name, error = %e, "Read model projection failed");
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

            // Blocks of `persist_block_size` messages, each followed by a
            // read model persist and a progress save.
            loop {
                let read_model = &mut self.read_model;
                let processed = self.core.run_pass(
                    Some(self.persist_block_size),
                    |handler, state, stream_name, message| {
                        let mut context = ReadModelContext {
                            stream_name,
                            read_model: &mut *read_model,
                            stop: false,
                        };
                        handler(state, message, &mut context)?;
                        Ok(context.stop)
                    },
                )?;
                if processed > 0 {
                    self.persist()?;
                }
                debug!(target: "eventfile::projection", name = %self.name, processed, "Read model block finished");
                if processed < self.persist_block_size || self.core.stop_requested() {
                    break;
                }
            }

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

    /// Persist the read model, then save progress
    fn persist(&mut self) -> Result<()> {
        self.read_model.persist()?;
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
        info!(target: "eventfile::projection", name = %self.name, "Read model projection stopped");
        Ok(())
    }

    /// Forget positions, go back to the initial state and empty the read
    /// model
    pub fn reset(&mut self) -> Result<()> {
        self.core.reset_progress();
        self.read_model.reset()?;
        self.persist()?;
        info!(target: "eventfile::projection", name = %self.name, "Read model projection reset");
        Ok(())
    }

    /// Remove the saved projection data, and the read model if asked
    pub fn delete(&mut self, delete_read_model: bool) -> Result<()> {
        if self.core.store.fetch_projection_data(&self.name).is_some() {
            self.core.store.delete_projection_data(&self.name)?;
        }
        if delete_read_model {
            self.read_model.delete()?;
        }
        self.core.request_stop();
        self.core.reset_progress();
        self.core.status = ProjectionStatus::Idle;
        self.core.publish();
        info!(
            target: "eventfile::projection",
            name = %self.name,
            delete_read_model,
            "Read model projection deleted"
        );
        Ok(())
    }

    /// Handle for stopping the projection from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.core.stop_handle()
    }

    /// Projection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read model being fed
    pub fn read_model(&self) -> &R {
        &self.read_model
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
