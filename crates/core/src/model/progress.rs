use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};
use crate::model::session::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress percentage out of range: {0}")]
    PercentOutOfRange(u8),

    #[error("completed record must carry 100 percent, got {0}")]
    InconsistentCompletion(u8),
}

//
// ─── PERCENT ───────────────────────────────────────────────────────────────────
//

/// Integer completion percentage in `[0, 100]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const COMPLETE: Percent = Percent(100);

    /// Creates a percent value, rejecting anything above 100.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PercentOutOfRange` for values above 100.
    pub fn new(value: u8) -> Result<Self, ProgressError> {
        if value > 100 {
            return Err(ProgressError::PercentOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Saturates an arbitrary integer into `[0, 100]`.
    ///
    /// Client-reported percentages can be negative or overshoot 100; storage
    /// only ever sees the clamped value.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

impl fmt::Debug for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Percent({})", self.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

//
// ─── LESSON STATUS ─────────────────────────────────────────────────────────────
//

/// Observable state of one lesson for one session.
///
/// `NotStarted` corresponds to an absent record; `Completed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    NotStarted,
    InProgress,
    Completed,
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Persisted completion state for one (session, lesson) pair.
///
/// Mutations enforce two policies the raw schema cannot express on its own:
/// the watched percentage never decreases, and completion is sticky. Both
/// keep `is_completed == percent_watched.is_complete()` true at all times.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    session_id: SessionId,
    lesson_id: LessonId,
    module_id: ModuleId,
    percent_watched: Percent,
    is_completed: bool,
    last_watched_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Creates the first record for a lesson a session just started watching.
    #[must_use]
    pub fn started(
        session_id: SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        percent: Percent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            lesson_id,
            module_id,
            percent_watched: percent,
            is_completed: percent.is_complete(),
            last_watched_at: now,
        }
    }

    /// Creates a record already in the completed state.
    #[must_use]
    pub fn completed(
        session_id: SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        now: DateTime<Utc>,
    ) -> Self {
        Self::started(session_id, lesson_id, module_id, Percent::COMPLETE, now)
    }

    /// Rehydrates a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InconsistentCompletion` if the completion flag
    /// and percentage disagree; rows written by this crate always agree.
    pub fn from_persisted(
        session_id: SessionId,
        lesson_id: LessonId,
        module_id: ModuleId,
        percent_watched: Percent,
        is_completed: bool,
        last_watched_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if is_completed != percent_watched.is_complete() {
            return Err(ProgressError::InconsistentCompletion(
                percent_watched.value(),
            ));
        }
        Ok(Self {
            session_id,
            lesson_id,
            module_id,
            percent_watched,
            is_completed,
            last_watched_at,
        })
    }

    /// Applies a watch-position report.
    ///
    /// The stored percentage is a high-water mark: a report below it leaves
    /// the percentage unchanged, and a completed lesson stays completed. The
    /// timestamp is refreshed on every report regardless.
    pub fn record_watch(&mut self, percent: Percent, now: DateTime<Utc>) {
        if percent > self.percent_watched {
            self.percent_watched = percent;
        }
        if self.percent_watched.is_complete() {
            self.is_completed = true;
        }
        self.last_watched_at = now;
    }

    /// Marks the lesson complete. Idempotent.
    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.record_watch(Percent::COMPLETE, now);
    }

    /// Derives the lesson status from this record.
    ///
    /// An absent record means `NotStarted`; an existing record at 0 percent
    /// still counts as started.
    #[must_use]
    pub fn status(&self) -> LessonStatus {
        if self.is_completed {
            LessonStatus::Completed
        } else {
            LessonStatus::InProgress
        }
    }

    // Accessors
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn percent_watched(&self) -> Percent {
        self.percent_watched
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn last_watched_at(&self) -> DateTime<Utc> {
        self.last_watched_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn session() -> SessionId {
        SessionId::new("session_1_test").unwrap()
    }

    fn record(percent: u8) -> ProgressRecord {
        ProgressRecord::started(
            session(),
            LessonId::new(1),
            ModuleId::new(1),
            Percent::new(percent).unwrap(),
            fixed_now(),
        )
    }

    #[test]
    fn percent_new_rejects_over_100() {
        let err = Percent::new(101).unwrap_err();
        assert_eq!(err, ProgressError::PercentOutOfRange(101));
    }

    #[test]
    fn percent_clamped_saturates_both_ends() {
        assert_eq!(Percent::clamped(-5), Percent::ZERO);
        assert_eq!(Percent::clamped(250), Percent::COMPLETE);
        assert_eq!(Percent::clamped(42).value(), 42);
    }

    #[test]
    fn started_at_100_is_already_complete() {
        let rec = record(100);
        assert!(rec.is_completed());
        assert_eq!(rec.status(), LessonStatus::Completed);
    }

    #[test]
    fn record_watch_ratchets_percentage() {
        let mut rec = record(40);
        let later = fixed_now() + Duration::seconds(10);

        rec.record_watch(Percent::new(25).unwrap(), later);
        assert_eq!(rec.percent_watched().value(), 40);
        assert_eq!(rec.last_watched_at(), later);

        rec.record_watch(Percent::new(70).unwrap(), later);
        assert_eq!(rec.percent_watched().value(), 70);
    }

    #[test]
    fn completion_is_sticky() {
        let mut rec = record(100);
        rec.record_watch(Percent::new(10).unwrap(), fixed_now() + Duration::seconds(1));
        assert!(rec.is_completed());
        assert_eq!(rec.percent_watched(), Percent::COMPLETE);
    }

    #[test]
    fn mark_complete_is_idempotent() {
        let mut rec = record(50);
        let t1 = fixed_now() + Duration::seconds(5);
        let t2 = t1 + Duration::seconds(5);

        rec.mark_complete(t1);
        let first = rec.clone();
        rec.mark_complete(t2);

        assert!(rec.is_completed());
        assert_eq!(rec.percent_watched(), first.percent_watched());
        assert!(rec.last_watched_at() >= first.last_watched_at());
    }

    #[test]
    fn update_to_100_then_mark_complete_converges() {
        let mut via_update = record(0);
        via_update.record_watch(Percent::COMPLETE, fixed_now());

        let mut via_both = record(0);
        via_both.record_watch(Percent::COMPLETE, fixed_now());
        via_both.mark_complete(fixed_now());

        assert_eq!(via_update, via_both);
    }

    #[test]
    fn from_persisted_rejects_inconsistent_completion() {
        let err = ProgressRecord::from_persisted(
            session(),
            LessonId::new(1),
            ModuleId::new(1),
            Percent::new(80).unwrap(),
            true,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::InconsistentCompletion(80));
    }

    #[test]
    fn from_persisted_roundtrips_valid_record() {
        let rec = ProgressRecord::from_persisted(
            session(),
            LessonId::new(2),
            ModuleId::new(1),
            Percent::new(55).unwrap(),
            false,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(rec.status(), LessonStatus::InProgress);
        assert_eq!(rec.percent_watched().value(), 55);
    }
}
