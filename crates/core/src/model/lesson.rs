use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};
use crate::model::video::VideoUrl;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson duration must be > 0 seconds when present")]
    ZeroDuration,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// An individual video unit within a module.
///
/// Lessons are ordered within their module by `order_index`; together with the
/// module ordering this defines the position of every lesson in the course.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    description: Option<String>,
    video_url: Option<VideoUrl>,
    duration_secs: Option<u32>,
    order_index: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a new Lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is empty or
    /// whitespace-only, and `LessonError::ZeroDuration` for a present but zero
    /// duration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LessonId,
        module_id: ModuleId,
        title: impl Into<String>,
        description: Option<String>,
        video_url: Option<VideoUrl>,
        duration_secs: Option<u32>,
        order_index: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if duration_secs == Some(0) {
            return Err(LessonError::ZeroDuration);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            module_id,
            title: title.trim().to_owned(),
            description,
            video_url,
            duration_secs,
            order_index,
            is_active,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    /// The module this lesson belongs to.
    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&VideoUrl> {
        self.video_url.as_ref()
    }

    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration_secs
    }

    /// Position of this lesson within its module.
    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
