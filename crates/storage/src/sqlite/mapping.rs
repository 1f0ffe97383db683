use course_core::model::{
    Lesson, LessonId, Module, ModuleId, Percent, ProgressRecord, SessionId, VideoUrl,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_row(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    let raw: i64 = row.try_get(field).map_err(ser)?;
    u32::try_from(raw).map_err(|_| StorageError::Serialization(format!("{field} overflow: {raw}")))
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    Module::new(
        module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("image_url").map_err(ser)?,
        row.try_get::<Option<String>, _>("materials_url").map_err(ser)?,
        u32_from_row(row, "order_index")?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let video_url = row
        .try_get::<Option<String>, _>("video_url")
        .map_err(ser)?
        .map(|raw| VideoUrl::parse(&raw).map_err(ser))
        .transpose()?;

    let duration_secs = row
        .try_get::<Option<i64>, _>("duration_secs")
        .map_err(ser)?
        .map(|raw| {
            u32::try_from(raw)
                .map_err(|_| StorageError::Serialization(format!("duration overflow: {raw}")))
        })
        .transpose()?;

    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        video_url,
        duration_secs,
        u32_from_row(row, "order_index")?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let session_id =
        SessionId::new(row.try_get::<String, _>("session_id").map_err(ser)?).map_err(ser)?;

    let raw_percent: i64 = row.try_get("percent_watched").map_err(ser)?;
    let percent = u8::try_from(raw_percent)
        .ok()
        .map(Percent::new)
        .transpose()
        .map_err(ser)?
        .ok_or_else(|| StorageError::Serialization(format!("invalid percent: {raw_percent}")))?;

    ProgressRecord::from_persisted(
        session_id,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        percent,
        row.try_get::<i64, _>("is_completed").map_err(ser)? != 0,
        row.try_get("last_watched_at").map_err(ser)?,
    )
    .map_err(ser)
}
