use std::sync::Arc;

use course_core::model::{LessonId, ModuleId, Percent, ProgressRecord, SessionId};
use course_core::tracker::{self, ModuleOutline};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Per-module summary for rendering a course overview.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleProgressView {
    pub module_id: ModuleId,
    pub percent: Percent,
    pub unlocked: bool,
    pub resume_lesson: Option<LessonId>,
}

/// Owns progress records: the sole writer of completion state.
///
/// Mutations are upserts keyed on (session, lesson); the ratchet and sticky
/// completion policies live on `ProgressRecord` itself, so every path through
/// here preserves them.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    //
    // ─── MUTATIONS ─────────────────────────────────────────────────────────────
    //

    /// Record a watch-position report for a lesson.
    ///
    /// The raw percentage may come straight from a client and is clamped into
    /// [0, 100] before it touches any record. Reaching 100 marks the lesson
    /// completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn update_progress(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        raw_percent: i64,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let now = self.clock.now();
        let percent = Percent::clamped(raw_percent);

        let record = match self.progress.lesson_progress(session, lesson_id).await? {
            Some(mut existing) => {
                existing.record_watch(percent, now);
                existing
            }
            None => ProgressRecord::started(session.clone(), lesson_id, module_id, percent, now),
        };

        self.progress.upsert_progress(&record).await?;
        Ok(record)
    }

    /// Mark a lesson complete for a session. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn mark_complete(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let now = self.clock.now();

        let record = match self.progress.lesson_progress(session, lesson_id).await? {
            Some(mut existing) => {
                existing.mark_complete(now);
                existing
            }
            None => ProgressRecord::completed(session.clone(), lesson_id, module_id, now),
        };

        self.progress.upsert_progress(&record).await?;
        Ok(record)
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    /// Every record for a session, most recently watched first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for(
        &self,
        session: &SessionId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let records = self.progress.progress_for_session(session).await?;
        Ok(records)
    }

    /// A session's records scoped to one module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn module_progress_records(
        &self,
        session: &SessionId,
        module_id: ModuleId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let records = self.progress.progress_for_module(session, module_id).await?;
        Ok(records)
    }

    /// The record for one lesson, if the session has started it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn lesson_progress(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, ProgressServiceError> {
        let record = self.progress.lesson_progress(session, lesson_id).await?;
        Ok(record)
    }

    /// Per-module completion, unlock state, and resume point for a whole
    /// course outline, computed from a single fetch of the session's records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn outline_view(
        &self,
        session: &SessionId,
        outline: &[ModuleOutline],
    ) -> Result<Vec<ModuleProgressView>, ProgressServiceError> {
        let records = self.progress.progress_for_session(session).await?;

        Ok(outline
            .iter()
            .enumerate()
            .map(|(index, entry)| ModuleProgressView {
                module_id: entry.module.id(),
                percent: tracker::module_progress(&entry.lessons, &records),
                unlocked: tracker::is_module_unlocked(index, outline, &records),
                resume_lesson: tracker::resume_lesson(&entry.lessons, &records)
                    .map(course_core::model::Lesson::id),
            })
            .collect())
    }
}
