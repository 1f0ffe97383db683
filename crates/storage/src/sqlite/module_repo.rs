use course_core::model::{Module, ModuleId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_module_row, module_id_from_i64};
use crate::repository::{ModuleRepository, NewModuleRecord, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO modules (title, description, image_url, materials_url, order_index, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(module.title)
        .bind(module.description)
        .bind(module.image_url)
        .bind(module.materials_url)
        .bind(i64::from(module.order_index))
        .bind(i64::from(module.is_active))
        .bind(module.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        module_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO modules (id, title, description, image_url, materials_url, order_index, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                image_url = excluded.image_url,
                materials_url = excluded.materials_url,
                order_index = excluded.order_index,
                is_active = excluded.is_active
            ",
        )
        .bind(id_to_i64("module_id", module.id().value())?)
        .bind(module.title().to_owned())
        .bind(module.description().map(ToString::to_string))
        .bind(module.image_url().map(ToString::to_string))
        .bind(module.materials_url().map(ToString::to_string))
        .bind(i64::from(module.order_index()))
        .bind(i64::from(module.is_active()))
        .bind(module.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, image_url, materials_url, order_index, is_active, created_at
            FROM modules WHERE id = ?1
            ",
        )
        .bind(id_to_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_module_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_modules(&self, only_active: bool) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, image_url, materials_url, order_index, is_active, created_at
            FROM modules
            WHERE (?1 = 0 OR is_active = 1)
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(i64::from(only_active))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut modules = Vec::with_capacity(rows.len());
        for row in rows {
            modules.push(map_module_row(&row)?);
        }
        Ok(modules)
    }

    async fn delete_module(&self, id: ModuleId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM modules WHERE id = ?1")
            .bind(id_to_i64("module_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }
}
