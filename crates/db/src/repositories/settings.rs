//! Settings repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{Settings, settings};
use bailiff_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel};

/// Settings repository for database operations.
#[derive(Clone)]
pub struct SettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl SettingsRepository {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Current settings, or the defaults when no row exists yet.
    pub async fn get(&self) -> AppResult<settings::Model> {
        let row = Settings::find_by_id(settings::GLOBAL_ID)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.unwrap_or_else(settings::Model::defaults))
    }

    /// Persist settings, creating the row if it is missing.
    pub async fn save(&self, model: settings::Model) -> AppResult<settings::Model> {
        let exists = Settings::find_by_id(settings::GLOBAL_ID)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some();

        let active = model.into_active_model().reset_all();
        if exists {
            active.update(self.db.as_ref()).await.map_err(db_err)
        } else {
            active.insert(self.db.as_ref()).await.map_err(db_err)
        }
    }
}
