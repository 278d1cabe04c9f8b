//! In-memory projection manager
//!
//! Hands out queries and projectors over one event store and keeps a
//! registry of the projectors it created, keyed by projection name. The
//! registry only observes: it reads each projector's shared progress and
//! cannot steer projectors. Deleting, resetting and stopping through the
//! manager are unsupported.

use crate::options::{ProjectionOptions, QueryOptions, ReadModelProjectionOptions};
use crate::progress::{ProjectionProgress, SharedProgress, StreamPositions};
use crate::projector::Projector;
use crate::query::Query;
use crate::read_model::{ReadModel, ReadModelProjector};
use crate::status::ProjectionStatus;
use eventfile_core::{paginate, validate_limit, Error, EventStore, Result, Value};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const MANAGER_NAME: &str = "InMemoryProjectionManager";

/// Creates queries and projectors and tracks the projectors by name
pub struct InMemoryProjectionManager {
    store: Arc<dyn EventStore>,
    projectors: RwLock<BTreeMap<String, SharedProgress>>,
}

impl std::fmt::Debug for InMemoryProjectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(MANAGER_NAME)
            .field("projections", &self.projectors.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl InMemoryProjectionManager {
    /// Manager over `store`
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            projectors: RwLock::new(BTreeMap::new()),
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// New query over the store
    pub fn create_query(&self, options: QueryOptions) -> Query {
        Query::new(Arc::clone(&self.store), options)
    }

    /// New projector named `name`
    ///
    /// The first projector created under a name is the one the manager
    /// reports on; later ones still work but are not tracked.
    pub fn create_projection(&self, name: &str, options: ProjectionOptions) -> Projector {
        let progress = self.register(name);
        Projector::new(Arc::clone(&self.store), name, options, progress)
    }

    /// New read model projector named `name`
    ///
    /// Registered like [`create_projection`](Self::create_projection).
    pub fn create_read_model_projection<R: ReadModel + 'static>(
        &self,
        name: &str,
        read_model: R,
        options: ReadModelProjectionOptions,
    ) -> ReadModelProjector<R> {
        let progress = self.register(name);
        ReadModelProjector::new(Arc::clone(&self.store), name, read_model, options, progress)
    }

    // First registration wins; later creations get an untracked progress.
    fn register(&self, name: &str) -> SharedProgress {
        let progress = SharedProgress::default();
        let mut projectors = self.projectors.write();
        if projectors.contains_key(name) {
            debug!(target: "eventfile::projection", name, "Projection already registered");
        } else {
            projectors.insert(name.to_string(), Arc::clone(&progress));
        }
        progress
    }

    // ========================================================================
    // Unsupported control
    // ========================================================================

    /// Always `UnsupportedOperation`
    pub fn delete_projection(&self, _name: &str, _delete_emitted_events: bool) -> Result<()> {
        Err(unsupported("Deleting a projection"))
    }

    /// Always `UnsupportedOperation`
    pub fn reset_projection(&self, _name: &str) -> Result<()> {
        Err(unsupported("Resetting a projection"))
    }

    /// Always `UnsupportedOperation`
    pub fn stop_projection(&self, _name: &str) -> Result<()> {
        Err(unsupported("Stopping a projection"))
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Registered projection names, sorted and paginated
    ///
    /// With a `filter`, returns `[filter]` if that exact name is registered.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `limit` is 0.
    pub fn fetch_projection_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_limit(limit)?;
        let projectors = self.projectors.read();
        let names: Vec<String> = match filter {
            Some(filter) => projectors
                .contains_key(filter)
                .then(|| filter.to_string())
                .into_iter()
                .collect(),
            None => projectors.keys().cloned().collect(),
        };
        Ok(paginate(names, limit, offset))
    }

    /// Registered projection names matching `pattern`, sorted and paginated
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `limit` is 0, `InvalidArgument` if `pattern` does not
    /// compile.
    pub fn fetch_projection_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_limit(limit)?;
        let regex = Regex::new(pattern)
            .map_err(|_| Error::InvalidArgument("Invalid regex pattern given".to_string()))?;
        let names = self
            .projectors
            .read()
            .keys()
            .filter(|name| regex.is_match(name))
            .cloned()
            .collect();
        Ok(paginate(names, limit, offset))
    }

    /// Status of a registered projection
    pub fn fetch_projection_status(&self, name: &str) -> Result<ProjectionStatus> {
        self.with_progress(name, |progress| progress.status)
    }

    /// Stream positions of a registered projection
    pub fn fetch_projection_stream_positions(&self, name: &str) -> Result<StreamPositions> {
        self.with_progress(name, |progress| progress.positions.clone())
    }

    /// State of a registered projection
    pub fn fetch_projection_state(&self, name: &str) -> Result<Value> {
        self.with_progress(name, |progress| progress.state.clone())
    }

    fn with_progress<T>(
        &self,
        name: &str,
        read: impl FnOnce(&ProjectionProgress) -> T,
    ) -> Result<T> {
        let projectors = self.projectors.read();
        let progress = projectors
            .get(name)
            .ok_or_else(|| Error::ProjectionNotFound(name.to_string()))?;
        let progress = progress.read();
        Ok(read(&progress))
    }
}

fn unsupported(action: &str) -> Error {
    Error::UnsupportedOperation(format!("{} is not supported in {}", action, MANAGER_NAME))
}
