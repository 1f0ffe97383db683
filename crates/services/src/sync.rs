use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use course_core::model::{LessonId, ModuleId, Percent, ProgressRecord, SessionId};
use storage::repository::{ProgressRepository, StorageError};

use crate::Clock;

/// Result of a two-phase progress write.
///
/// `Persisted` means the store confirmed the record. `LocalOnly` means the
/// store could not be read or written; the tentative record is retained
/// locally, stays visible to the session, and will be retried by `flush`.
#[derive(Debug)]
pub enum SyncOutcome {
    Persisted(ProgressRecord),
    LocalOnly {
        record: ProgressRecord,
        error: StorageError,
    },
}

impl SyncOutcome {
    /// The record as the session should see it, persisted or not.
    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        match self {
            SyncOutcome::Persisted(record) | SyncOutcome::LocalOnly { record, .. } => record,
        }
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, SyncOutcome::Persisted(_))
    }
}

type PendingKey = (SessionId, LessonId);

/// Applies progress updates optimistically: local tentative state first, then
/// the persistence write, reconciling on the response.
///
/// A store failure never loses the update and never interrupts playback; the
/// record parks in the pending map until a later report or an explicit
/// `flush` lands it.
pub struct ProgressSync {
    clock: Clock,
    store: Arc<dyn ProgressRepository>,
    pending: Mutex<HashMap<PendingKey, ProgressRecord>>,
}

impl ProgressSync {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            store,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<PendingKey, ProgressRecord>> {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still usable, so recover it instead of failing the session.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report a watch position. Clamped, ratcheted, two-phase.
    pub async fn report_watch(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        raw_percent: i64,
    ) -> SyncOutcome {
        let percent = Percent::clamped(raw_percent);
        self.apply(session, lesson_id, module_id, percent).await
    }

    /// Report lesson completion. Idempotent, two-phase.
    pub async fn report_complete(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
    ) -> SyncOutcome {
        self.apply(session, lesson_id, module_id, Percent::COMPLETE)
            .await
    }

    async fn apply(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        percent: Percent,
    ) -> SyncOutcome {
        let now = self.clock.now();
        let key = (session.clone(), lesson_id);

        let local = self.pending().get(&key).cloned();
        let base = match local {
            Some(record) => Some(record),
            None => match self.store.lesson_progress(session, lesson_id).await {
                Ok(stored) => stored,
                Err(error) => {
                    // Cannot see the stored high-water mark, so do not risk
                    // overwriting it: park the tentative record and retry later.
                    let record = ProgressRecord::started(
                        session.clone(),
                        lesson_id,
                        module_id,
                        percent,
                        now,
                    );
                    self.pending().insert(key, record.clone());
                    return SyncOutcome::LocalOnly { record, error };
                }
            },
        };

        let record = match base {
            Some(mut existing) => {
                existing.record_watch(percent, now);
                existing
            }
            None => ProgressRecord::started(session.clone(), lesson_id, module_id, percent, now),
        };

        self.pending().insert(key.clone(), record.clone());
        match self.store.upsert_progress(&record).await {
            Ok(()) => {
                self.pending().remove(&key);
                SyncOutcome::Persisted(record)
            }
            Err(error) => SyncOutcome::LocalOnly { record, error },
        }
    }

    /// Retry every parked record, merging onto the stored state.
    ///
    /// Returns how many records were persisted. Stops at the first store
    /// failure; everything not yet flushed stays pending.
    ///
    /// # Errors
    ///
    /// Returns the `StorageError` that interrupted the retry.
    pub async fn flush(&self) -> Result<usize, StorageError> {
        let parked: Vec<(PendingKey, ProgressRecord)> = self
            .pending()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut flushed = 0;
        for ((session, lesson_id), local) in parked {
            let stored = self.store.lesson_progress(&session, lesson_id).await?;
            let record = match stored {
                Some(mut existing) => {
                    existing.record_watch(local.percent_watched(), local.last_watched_at());
                    existing
                }
                None => local,
            };
            self.store.upsert_progress(&record).await?;
            self.pending().remove(&(session, lesson_id));
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Tentative records not yet confirmed by the store.
    #[must_use]
    pub fn local_snapshot(&self, session: &SessionId) -> Vec<ProgressRecord> {
        let mut records: Vec<ProgressRecord> = self
            .pending()
            .iter()
            .filter(|((s, _), _)| s == session)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by_key(|r| r.lesson_id());
        records
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use course_core::time::fixed_clock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::InMemoryRepository;

    /// Delegates to an in-memory store unless told to fail.
    #[derive(Clone)]
    struct FlakyRepo {
        inner: InMemoryRepository,
        failing: Arc<AtomicBool>,
    }

    impl FlakyRepo {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                failing: Arc::new(AtomicBool::new(false)),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StorageError::Connection("injected failure".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ProgressRepository for FlakyRepo {
        async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
            self.check()?;
            self.inner.upsert_progress(record).await
        }

        async fn progress_for_session(
            &self,
            session: &SessionId,
        ) -> Result<Vec<ProgressRecord>, StorageError> {
            self.check()?;
            self.inner.progress_for_session(session).await
        }

        async fn progress_for_module(
            &self,
            session: &SessionId,
            module_id: ModuleId,
        ) -> Result<Vec<ProgressRecord>, StorageError> {
            self.check()?;
            self.inner.progress_for_module(session, module_id).await
        }

        async fn lesson_progress(
            &self,
            session: &SessionId,
            lesson_id: LessonId,
        ) -> Result<Option<ProgressRecord>, StorageError> {
            self.check()?;
            self.inner.lesson_progress(session, lesson_id).await
        }
    }

    fn session() -> SessionId {
        SessionId::new("session_1_sync").unwrap()
    }

    #[tokio::test]
    async fn healthy_store_persists_immediately() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));

        let outcome = sync
            .report_watch(&session(), LessonId::new(1), ModuleId::new(1), 40)
            .await;

        assert!(outcome.is_persisted());
        assert_eq!(sync.pending_count(), 0);
        let stored = repo
            .lesson_progress(&session(), LessonId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.percent_watched().value(), 40);
    }

    #[tokio::test]
    async fn store_failure_retains_local_state() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));
        repo.set_failing(true);

        let outcome = sync
            .report_watch(&session(), LessonId::new(1), ModuleId::new(1), 55)
            .await;

        assert!(!outcome.is_persisted());
        assert_eq!(outcome.record().percent_watched().value(), 55);
        assert_eq!(sync.pending_count(), 1);
        assert_eq!(sync.local_snapshot(&session()).len(), 1);
    }

    #[tokio::test]
    async fn local_state_ratchets_while_store_is_down() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));
        repo.set_failing(true);

        sync.report_watch(&session(), LessonId::new(1), ModuleId::new(1), 70)
            .await;
        let outcome = sync
            .report_watch(&session(), LessonId::new(1), ModuleId::new(1), 30)
            .await;

        assert_eq!(outcome.record().percent_watched().value(), 70);
        assert_eq!(sync.pending_count(), 1);
    }

    #[tokio::test]
    async fn flush_lands_parked_records_after_recovery() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));

        repo.set_failing(true);
        sync.report_complete(&session(), LessonId::new(1), ModuleId::new(1))
            .await;
        assert_eq!(sync.pending_count(), 1);

        repo.set_failing(false);
        let flushed = sync.flush().await.unwrap();
        assert_eq!(flushed, 1);
        assert_eq!(sync.pending_count(), 0);

        let stored = repo
            .lesson_progress(&session(), LessonId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_completed());
    }

    #[tokio::test]
    async fn flush_surfaces_errors_and_keeps_records() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));

        repo.set_failing(true);
        sync.report_watch(&session(), LessonId::new(1), ModuleId::new(1), 20)
            .await;

        let err = sync.flush().await.unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
        assert_eq!(sync.pending_count(), 1);
    }

    #[tokio::test]
    async fn later_report_lands_everything_once_store_recovers() {
        let repo = FlakyRepo::new();
        let sync = ProgressSync::new(fixed_clock(), Arc::new(repo.clone()));

        repo.set_failing(true);
        sync.report_watch(&session(), LessonId::new(1), ModuleId::new(1), 50)
            .await;

        repo.set_failing(false);
        let outcome = sync
            .report_watch(&session(), LessonId::new(1), ModuleId::new(1), 80)
            .await;

        assert!(outcome.is_persisted());
        assert_eq!(sync.pending_count(), 0);
        let stored = repo
            .lesson_progress(&session(), LessonId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.percent_watched().value(), 80);
    }
}
