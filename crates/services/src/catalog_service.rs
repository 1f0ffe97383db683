use std::sync::Arc;

use course_core::model::{Lesson, LessonId, Module, ModuleId, VideoUrl};
use course_core::tracker::ModuleOutline;
use storage::repository::{
    LessonRepository, ModuleRepository, NewLessonRecord, NewModuleRecord, StorageError,
};

use crate::Clock;
use crate::error::CatalogServiceError;

/// Orchestrates course content management and outline assembly.
///
/// This is the admin-facing side of the platform: modules and lessons are
/// created, reordered, hidden, and deleted here, and the learner-facing
/// ordered outline is assembled here.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            lessons,
        }
    }

    //
    // ─── MODULES ───────────────────────────────────────────────────────────────
    //

    /// Create a module and persist it. New modules start active.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Module` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_module(
        &self,
        title: String,
        description: Option<String>,
        image_url: Option<String>,
        materials_url: Option<String>,
        order_index: u32,
    ) -> Result<ModuleId, CatalogServiceError> {
        let now = self.clock.now();
        let module = Module::new(
            ModuleId::new(1),
            title,
            description,
            image_url,
            materials_url,
            order_index,
            true,
            now,
        )?;
        let module_id = self
            .modules
            .insert_module(NewModuleRecord::from_module(&module))
            .await?;
        Ok(module_id)
    }

    /// Replace a module's editable fields, preserving its creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Module` if validation fails.
    /// Returns `CatalogServiceError::Storage` if the module does not exist or
    /// repository access fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_module(
        &self,
        module_id: ModuleId,
        title: String,
        description: Option<String>,
        image_url: Option<String>,
        materials_url: Option<String>,
        order_index: u32,
        is_active: bool,
    ) -> Result<(), CatalogServiceError> {
        let module = self
            .modules
            .get_module(module_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let updated = Module::new(
            module.id(),
            title,
            description,
            image_url,
            materials_url,
            order_index,
            is_active,
            module.created_at(),
        )?;
        self.modules.upsert_module(&updated).await?;
        Ok(())
    }

    /// Delete a module; its lessons and their progress rows cascade.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if the module
    /// does not exist, or another storage error if the delete fails.
    pub async fn delete_module(&self, module_id: ModuleId) -> Result<(), CatalogServiceError> {
        if !self.modules.delete_module(module_id).await? {
            return Err(StorageError::NotFound.into());
        }
        Ok(())
    }

    //
    // ─── LESSONS ───────────────────────────────────────────────────────────────
    //

    /// Create a lesson under an existing module. New lessons start active.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Lesson` or `::VideoUrl` for validation
    /// failures, and `::Storage` with `NotFound` if the module is missing.
    pub async fn create_lesson(
        &self,
        module_id: ModuleId,
        title: String,
        description: Option<String>,
        video_url: Option<String>,
        duration_secs: Option<u32>,
        order_index: u32,
    ) -> Result<LessonId, CatalogServiceError> {
        self.modules
            .get_module(module_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let video_url = video_url.map(VideoUrl::parse).transpose()?;
        let now = self.clock.now();
        let lesson = Lesson::new(
            LessonId::new(1),
            module_id,
            title,
            description,
            video_url,
            duration_secs,
            order_index,
            true,
            now,
        )?;
        let lesson_id = self
            .lessons
            .insert_lesson(NewLessonRecord::from_lesson(&lesson))
            .await?;
        Ok(lesson_id)
    }

    /// Replace a lesson's editable fields, preserving module and creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Lesson` or `::VideoUrl` if validation
    /// fails, and `::Storage` if the lesson is missing or access fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_lesson(
        &self,
        lesson_id: LessonId,
        title: String,
        description: Option<String>,
        video_url: Option<String>,
        duration_secs: Option<u32>,
        order_index: u32,
        is_active: bool,
    ) -> Result<(), CatalogServiceError> {
        let lesson = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let video_url = video_url.map(VideoUrl::parse).transpose()?;
        let updated = Lesson::new(
            lesson.id(),
            lesson.module_id(),
            title,
            description,
            video_url,
            duration_secs,
            order_index,
            is_active,
            lesson.created_at(),
        )?;
        self.lessons.upsert_lesson(&updated).await?;
        Ok(())
    }

    /// Delete a lesson; its progress rows cascade.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` with `NotFound` if the lesson
    /// does not exist, or another storage error if the delete fails.
    pub async fn delete_lesson(&self, lesson_id: LessonId) -> Result<(), CatalogServiceError> {
        if !self.lessons.delete_lesson(lesson_id).await? {
            return Err(StorageError::NotFound.into());
        }
        Ok(())
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    /// The learner-facing course: active modules in order, each with its
    /// active lessons in order. This is the input every tracker query takes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn course_outline(&self) -> Result<Vec<ModuleOutline>, CatalogServiceError> {
        let modules = self.modules.list_modules(true).await?;
        let mut outline = Vec::with_capacity(modules.len());
        for module in modules {
            let lessons = self.lessons.lessons_by_module(module.id(), true).await?;
            outline.push(ModuleOutline::new(module, lessons));
        }
        Ok(outline)
    }

    /// One module (active or not) with its active lessons.
    ///
    /// Returns `Ok(None)` when the module does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn module_outline(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<ModuleOutline>, CatalogServiceError> {
        let Some(module) = self.modules.get_module(module_id).await? else {
            return Ok(None);
        };
        let lessons = self.lessons.lessons_by_module(module.id(), true).await?;
        Ok(Some(ModuleOutline::new(module, lessons)))
    }

    /// A module's active lessons in order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn lessons_of(&self, module_id: ModuleId) -> Result<Vec<Lesson>, CatalogServiceError> {
        let lessons = self.lessons.lessons_by_module(module_id, true).await?;
        Ok(lessons)
    }

    /// Fetch a lesson by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn lesson(&self, lesson_id: LessonId) -> Result<Option<Lesson>, CatalogServiceError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        Ok(lesson)
    }
}
