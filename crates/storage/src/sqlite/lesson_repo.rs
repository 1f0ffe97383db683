use course_core::model::{Lesson, LessonId, ModuleId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, lesson_id_from_i64, map_lesson_row};
use crate::repository::{LessonRepository, NewLessonRecord, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lessons (module_id, title, description, video_url, duration_secs, order_index, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("module_id", lesson.module_id.value())?)
        .bind(lesson.title)
        .bind(lesson.description)
        .bind(lesson.video_url.map(|u| u.as_str().to_owned()))
        .bind(lesson.duration_secs.map(i64::from))
        .bind(i64::from(lesson.order_index))
        .bind(i64::from(lesson.is_active))
        .bind(lesson.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        lesson_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, module_id, title, description, video_url, duration_secs, order_index, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                description = excluded.description,
                video_url = excluded.video_url,
                duration_secs = excluded.duration_secs,
                order_index = excluded.order_index,
                is_active = excluded.is_active
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .bind(id_to_i64("module_id", lesson.module_id().value())?)
        .bind(lesson.title().to_owned())
        .bind(lesson.description().map(ToString::to_string))
        .bind(lesson.video_url().map(|u| u.as_str().to_owned()))
        .bind(lesson.duration_secs().map(i64::from))
        .bind(i64::from(lesson.order_index()))
        .bind(i64::from(lesson.is_active()))
        .bind(lesson.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, description, video_url, duration_secs, order_index, is_active, created_at
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id_to_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_lesson_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn lessons_by_module(
        &self,
        module_id: ModuleId,
        only_active: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, module_id, title, description, video_url, duration_secs, order_index, is_active, created_at
            FROM lessons
            WHERE module_id = ?1 AND (?2 = 0 OR is_active = 1)
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_to_i64("module_id", module_id.value())?)
        .bind(i64::from(only_active))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(id_to_i64("lesson_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }
}
