//! Transaction control for the file store

use super::FileEventStore;
use eventfile_core::{Result, TransactionalEventStore};
use tracing::{debug, info, warn};

impl FileEventStore {
    /// Run `op` inside a transaction
    ///
    /// Commits when `op` succeeds. If `op` or the commit fails, the
    /// transaction is rolled back and the error returned; memory then
    /// reflects none of `op`'s changes.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a transaction is already active, otherwise the
    /// error of `op` or of the commit.
    pub fn transactional<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.begin_transaction()?;

        let result = op(self).and_then(|value| self.commit().map(|()| value));

        if let Err(e) = &result {
            warn!(
                target: "eventfile::txn",
                path = %self.path().display(),
                error = %e,
                "Transactional operation failed, rolling back"
            );
            if self.in_transaction() {
                self.rollback()?;
            }
        }
        result
    }
}

impl TransactionalEventStore for FileEventStore {
    fn begin_transaction(&self) -> Result<()> {
        self.coordinator.begin(|| self.inner.export_snapshot())?;
        debug!(target: "eventfile::txn", path = %self.path().display(), "Transaction started");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let path = self.path();
        let result = self.coordinator.commit_with(|| {
            let (bytes, streams, events) = self.inner.with_snapshot(|snapshot| {
                self.codec
                    .encode(path, snapshot)
                    .map(|bytes| (bytes, snapshot.stream_count(), snapshot.event_count()))
            })?;
            let info = self.writer.write_atomic(&bytes, path)?;
            Ok((info, streams, events))
        });

        match result {
            Ok((info, streams, events)) => {
                info!(
                    target: "eventfile::txn",
                    path = %info.path.display(),
                    streams,
                    events,
                    size_bytes = info.size_bytes,
                    "Transaction committed"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "eventfile::txn",
                    path = %path.display(),
                    error = %e,
                    "Commit failed, transaction stays open"
                );
                Err(e)
            }
        }
    }

    fn rollback(&self) -> Result<()> {
        let snapshot = self.coordinator.rollback()?;
        self.inner.import_snapshot(snapshot);
        debug!(target: "eventfile::txn", path = %self.path().display(), "Transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.coordinator.in_transaction()
    }
}
