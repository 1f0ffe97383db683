use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Lesson, LessonId, Module, ModuleId, ProgressRecord, SessionId, VideoUrl,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── INSERT RECORDS ────────────────────────────────────────────────────────────
//

/// Insert shape for a module whose id the backend assigns.
#[derive(Debug, Clone)]
pub struct NewModuleRecord {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub materials_url: Option<String>,
    pub order_index: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewModuleRecord {
    /// Captures a validated module's fields, discarding its placeholder id.
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        Self {
            title: module.title().to_owned(),
            description: module.description().map(str::to_owned),
            image_url: module.image_url().map(str::to_owned),
            materials_url: module.materials_url().map(str::to_owned),
            order_index: module.order_index(),
            is_active: module.is_active(),
            created_at: module.created_at(),
        }
    }

    /// Rebuilds the domain module once the backend has assigned an id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored fields no longer
    /// pass domain validation.
    pub fn into_module(self, id: ModuleId) -> Result<Module, StorageError> {
        Module::new(
            id,
            self.title,
            self.description,
            self.image_url,
            self.materials_url,
            self.order_index,
            self.is_active,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Insert shape for a lesson whose id the backend assigns.
#[derive(Debug, Clone)]
pub struct NewLessonRecord {
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<VideoUrl>,
    pub duration_secs: Option<u32>,
    pub order_index: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewLessonRecord {
    /// Captures a validated lesson's fields, discarding its placeholder id.
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            module_id: lesson.module_id(),
            title: lesson.title().to_owned(),
            description: lesson.description().map(str::to_owned),
            video_url: lesson.video_url().cloned(),
            duration_secs: lesson.duration_secs(),
            order_index: lesson.order_index(),
            is_active: lesson.is_active(),
            created_at: lesson.created_at(),
        }
    }

    /// Rebuilds the domain lesson once the backend has assigned an id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored fields no longer
    /// pass domain validation.
    pub fn into_lesson(self, id: LessonId) -> Result<Lesson, StorageError> {
        Lesson::new(
            id,
            self.module_id,
            self.title,
            self.description,
            self.video_url,
            self.duration_secs,
            self.order_index,
            self.is_active,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for course modules.
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Insert a new module and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError>;

    /// Persist or update a module by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError>;

    /// Fetch a module by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// List modules ordered by `order_index`, then id.
    ///
    /// With `only_active`, hidden modules are filtered out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_modules(&self, only_active: bool) -> Result<Vec<Module>, StorageError>;

    /// Delete a module; lessons and progress rows cascade.
    ///
    /// Returns whether a module was actually removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn delete_module(&self, id: ModuleId) -> Result<bool, StorageError>;
}

/// Repository contract for lessons.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Insert a new lesson and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError>;

    /// Persist or update a lesson by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// List a module's lessons ordered by `order_index`, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn lessons_by_module(
        &self,
        module_id: ModuleId,
        only_active: bool,
    ) -> Result<Vec<Lesson>, StorageError>;

    /// Delete a lesson; its progress rows cascade.
    ///
    /// Returns whether a lesson was actually removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn delete_lesson(&self, id: LessonId) -> Result<bool, StorageError>;
}

/// Repository contract for progress records.
///
/// A record is unique per (session, lesson) pair; `upsert_progress` replaces
/// any existing row for that pair.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist or update the record for its (session, lesson) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Every record for a session, most recently watched first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn progress_for_session(
        &self,
        session: &SessionId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// A session's records for one module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn progress_for_module(
        &self,
        session: &SessionId,
        module_id: ModuleId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// The record for one (session, lesson) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn lesson_progress(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    modules: HashMap<ModuleId, Module>,
    lessons: HashMap<LessonId, Lesson>,
    progress: HashMap<(SessionId, LessonId), ProgressRecord>,
    next_module_id: u64,
    next_lesson_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn sorted_modules(mut modules: Vec<Module>) -> Vec<Module> {
    modules.sort_by_key(|m| (m.order_index(), m.id()));
    modules
}

fn sorted_lessons(mut lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons.sort_by_key(|l| (l.order_index(), l.id()));
    lessons
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let mut state = self.lock()?;
        state.next_module_id += 1;
        let id = ModuleId::new(state.next_module_id);
        let module = module.into_module(id)?;
        state.modules.insert(id, module);
        Ok(id)
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.next_module_id = state.next_module_id.max(module.id().value());
        state.modules.insert(module.id(), module.clone());
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let state = self.lock()?;
        Ok(state.modules.get(&id).cloned())
    }

    async fn list_modules(&self, only_active: bool) -> Result<Vec<Module>, StorageError> {
        let state = self.lock()?;
        let modules = state
            .modules
            .values()
            .filter(|m| !only_active || m.is_active())
            .cloned()
            .collect();
        Ok(sorted_modules(modules))
    }

    async fn delete_module(&self, id: ModuleId) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        if state.modules.remove(&id).is_none() {
            return Ok(false);
        }
        // Mirror the SQL ON DELETE CASCADE behavior.
        state.lessons.retain(|_, l| l.module_id() != id);
        state.progress.retain(|_, p| p.module_id() != id);
        Ok(true)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let mut state = self.lock()?;
        if !state.modules.contains_key(&lesson.module_id) {
            return Err(StorageError::NotFound);
        }
        state.next_lesson_id += 1;
        let id = LessonId::new(state.next_lesson_id);
        let lesson = lesson.into_lesson(id)?;
        state.lessons.insert(id, lesson);
        Ok(id)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.next_lesson_id = state.next_lesson_id.max(lesson.id().value());
        state.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let state = self.lock()?;
        Ok(state.lessons.get(&id).cloned())
    }

    async fn lessons_by_module(
        &self,
        module_id: ModuleId,
        only_active: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let state = self.lock()?;
        let lessons = state
            .lessons
            .values()
            .filter(|l| l.module_id() == module_id && (!only_active || l.is_active()))
            .cloned()
            .collect();
        Ok(sorted_lessons(lessons))
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        if state.lessons.remove(&id).is_none() {
            return Ok(false);
        }
        state.progress.retain(|_, p| p.lesson_id() != id);
        Ok(true)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.progress.insert(
            (record.session_id().clone(), record.lesson_id()),
            record.clone(),
        );
        Ok(())
    }

    async fn progress_for_session(
        &self,
        session: &SessionId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.session_id() == session)
            .cloned()
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.last_watched_at()));
        Ok(records)
    }

    async fn progress_for_module(
        &self,
        session: &SessionId,
        module_id: ModuleId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.session_id() == session && r.module_id() == module_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.lesson_id());
        Ok(records)
    }

    async fn lesson_progress(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.progress.get(&(session.clone(), lesson_id)).cloned())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub modules: Arc<dyn ModuleRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let modules: Arc<dyn ModuleRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            modules,
            lessons,
            progress,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::Percent;
    use course_core::time::fixed_now;

    fn build_module(order: u32) -> NewModuleRecord {
        let module = Module::new(
            ModuleId::new(1),
            format!("Module at {order}"),
            None,
            None,
            None,
            order,
            true,
            fixed_now(),
        )
        .unwrap();
        NewModuleRecord::from_module(&module)
    }

    fn build_lesson(module_id: ModuleId, order: u32) -> NewLessonRecord {
        let lesson = Lesson::new(
            LessonId::new(1),
            module_id,
            format!("Lesson at {order}"),
            None,
            None,
            Some(300),
            order,
            true,
            fixed_now(),
        )
        .unwrap();
        NewLessonRecord::from_lesson(&lesson)
    }

    #[tokio::test]
    async fn insert_assigns_sequential_module_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_module(build_module(0)).await.unwrap();
        let second = repo.insert_module(build_module(1)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(repo.list_modules(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_modules_orders_by_order_index() {
        let repo = InMemoryRepository::new();
        repo.insert_module(build_module(5)).await.unwrap();
        repo.insert_module(build_module(1)).await.unwrap();

        let modules = repo.list_modules(false).await.unwrap();
        assert_eq!(modules[0].order_index(), 1);
        assert_eq!(modules[1].order_index(), 5);
    }

    #[tokio::test]
    async fn delete_module_cascades_to_lessons_and_progress() {
        let repo = InMemoryRepository::new();
        let module_id = repo.insert_module(build_module(0)).await.unwrap();
        let lesson_id = repo
            .insert_lesson(build_lesson(module_id, 0))
            .await
            .unwrap();

        let session = SessionId::new("session_1_cascade").unwrap();
        let record = ProgressRecord::started(
            session.clone(),
            lesson_id,
            module_id,
            Percent::new(50).unwrap(),
            fixed_now(),
        );
        repo.upsert_progress(&record).await.unwrap();

        assert!(repo.delete_module(module_id).await.unwrap());
        assert!(repo.get_lesson(lesson_id).await.unwrap().is_none());
        assert!(repo
            .lesson_progress(&session, lesson_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn insert_lesson_requires_existing_module() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_lesson(build_lesson(ModuleId::new(99), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn progress_upsert_replaces_by_session_and_lesson() {
        let repo = InMemoryRepository::new();
        let module_id = repo.insert_module(build_module(0)).await.unwrap();
        let lesson_id = repo
            .insert_lesson(build_lesson(module_id, 0))
            .await
            .unwrap();

        let session = SessionId::new("session_1_upsert").unwrap();
        let mut record = ProgressRecord::started(
            session.clone(),
            lesson_id,
            module_id,
            Percent::new(30).unwrap(),
            fixed_now(),
        );
        repo.upsert_progress(&record).await.unwrap();

        record.record_watch(Percent::new(80).unwrap(), fixed_now());
        repo.upsert_progress(&record).await.unwrap();

        let stored = repo
            .lesson_progress(&session, lesson_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.percent_watched().value(), 80);
        assert_eq!(repo.progress_for_session(&session).await.unwrap().len(), 1);
    }
}
