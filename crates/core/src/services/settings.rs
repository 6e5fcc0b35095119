//! Organisation settings service.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use bailiff_common::AppResult;
use bailiff_db::{entities::settings, repositories::SettingsRepository};

/// Input for updating settings. Absent fields keep their value.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsInput {
    #[validate(length(min = 1, max = 128))]
    pub organisation_name: Option<String>,
    pub sms_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    pub weekly_reminders_enabled: Option<bool>,
    pub day_of_reminders_enabled: Option<bool>,
    pub post_hearing_enabled: Option<bool>,
}

/// Settings service.
#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    /// Create a new settings service.
    #[must_use]
    pub const fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    /// Current settings.
    pub async fn get(&self) -> AppResult<settings::Model> {
        self.repo.get().await
    }

    /// Apply a partial update.
    pub async fn update(
        &self,
        updated_by: &str,
        input: UpdateSettingsInput,
    ) -> AppResult<settings::Model> {
        input.validate()?;
        let mut current = self.repo.get().await?;

        if let Some(name) = input.organisation_name {
            current.organisation_name = name;
        }
        if let Some(v) = input.sms_enabled {
            current.sms_enabled = v;
        }
        if let Some(v) = input.email_enabled {
            current.email_enabled = v;
        }
        if let Some(v) = input.weekly_reminders_enabled {
            current.weekly_reminders_enabled = v;
        }
        if let Some(v) = input.day_of_reminders_enabled {
            current.day_of_reminders_enabled = v;
        }
        if let Some(v) = input.post_hearing_enabled {
            current.post_hearing_enabled = v;
        }
        current.updated_by = Some(updated_by.to_string());
        current.updated_at = Some(Utc::now().into());

        let saved = self.repo.save(current).await?;
        tracing::info!(updated_by = %updated_by, "Settings updated");
        Ok(saved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_partial_update_keeps_other_switches() {
        let stored = settings::Model::defaults();
        let mut saved = stored.clone();
        saved.sms_enabled = false;
        saved.updated_by = Some("a1".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored.clone()]])
            .append_query_results([[stored]])
            .append_query_results([[saved]])
            .into_connection();
        let service = SettingsService::new(SettingsRepository::new(Arc::new(db)));

        let result = service
            .update(
                "a1",
                UpdateSettingsInput {
                    sms_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!result.sms_enabled);
        assert!(result.email_enabled);
        assert_eq!(result.updated_by.as_deref(), Some("a1"));
    }
}
