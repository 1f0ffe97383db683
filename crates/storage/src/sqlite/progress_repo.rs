use course_core::model::{LessonId, ModuleId, ProgressRecord, SessionId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (session_id, lesson_id, module_id, is_completed, percent_watched, last_watched_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(session_id, lesson_id) DO UPDATE SET
                module_id = excluded.module_id,
                is_completed = excluded.is_completed,
                percent_watched = excluded.percent_watched,
                last_watched_at = excluded.last_watched_at
            ",
        )
        .bind(record.session_id().as_str().to_owned())
        .bind(id_to_i64("lesson_id", record.lesson_id().value())?)
        .bind(id_to_i64("module_id", record.module_id().value())?)
        .bind(i64::from(record.is_completed()))
        .bind(i64::from(record.percent_watched().value()))
        .bind(record.last_watched_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn progress_for_session(
        &self,
        session: &SessionId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT session_id, lesson_id, module_id, is_completed, percent_watched, last_watched_at
            FROM progress
            WHERE session_id = ?1
            ORDER BY last_watched_at DESC
            ",
        )
        .bind(session.as_str().to_owned())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn progress_for_module(
        &self,
        session: &SessionId,
        module_id: ModuleId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT session_id, lesson_id, module_id, is_completed, percent_watched, last_watched_at
            FROM progress
            WHERE session_id = ?1 AND module_id = ?2
            ORDER BY lesson_id ASC
            ",
        )
        .bind(session.as_str().to_owned())
        .bind(id_to_i64("module_id", module_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn lesson_progress(
        &self,
        session: &SessionId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, lesson_id, module_id, is_completed, percent_watched, last_watched_at
            FROM progress
            WHERE session_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(session.as_str().to_owned())
        .bind(id_to_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_progress_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
