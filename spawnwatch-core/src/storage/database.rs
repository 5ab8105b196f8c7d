use crate::common::error::{NotifierError, Result};
use crate::database::DatabaseManager;
use crate::domain::*;
use crate::storage::traits::SubscriptionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// libSQL-backed subscription store.
///
/// Documents are stored as JSON rows keyed by (user, scope); the scope index
/// backs the per-scope list queries. Rows are read back through serde so
/// missing fields default exactly as they do for any other adapter.
pub struct DatabaseStorage {
    db: Arc<DatabaseManager>,
}

impl DatabaseStorage {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    fn record_to_row_data(record: &SubscriptionRecord) -> Result<String> {
        serde_json::to_string(record).map_err(|e| NotifierError::Store {
            message: format!("Failed to serialize subscription: {e}"),
        })
    }

    fn row_data_to_record(data: &str) -> Result<SubscriptionRecord> {
        serde_json::from_str(data).map_err(|e| NotifierError::Store {
            message: format!("Failed to deserialize subscription: {e}"),
        })
    }

    /// Load every subscription document for a scope, ascending user id.
    async fn load_scope(&self, scope: ScopeId) -> Result<Vec<SubscriptionRecord>> {
        let conn = self.db.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT data FROM subscriptions WHERE scope_id = ?1 ORDER BY user_id",
                libsql::params![scope.0 as i64],
            )
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to query subscriptions: {e}"),
            })?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| NotifierError::Store {
            message: format!("Failed to read row: {e}"),
        })? {
            let data: String = row.get(0).map_err(|e| NotifierError::Store {
                message: format!("Failed to get data: {e}"),
            })?;
            records.push(Self::row_data_to_record(&data)?);
        }

        debug!("Loaded {} subscription documents for scope {}", records.len(), scope);
        Ok(records)
    }

    /// Upsert one subscription document.
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<()> {
        let conn = self.db.get_connection().await?;
        let data = Self::record_to_row_data(record)?;

        conn.execute(
            "INSERT INTO subscriptions (user_id, scope_id, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, COALESCE((SELECT created_at FROM subscriptions WHERE user_id = ?1 AND scope_id = ?2), datetime('now')), datetime('now'))
             ON CONFLICT(user_id, scope_id) DO UPDATE SET
               data = excluded.data,
               updated_at = excluded.updated_at",
            libsql::params![record.user.0 as i64, record.scope.0 as i64, data],
        )
        .await
        .map_err(|e| NotifierError::Store {
            message: format!("Failed to upsert subscription: {e}"),
        })?;

        Ok(())
    }

    /// Read-modify-write one (user, scope) document.
    async fn update_record<F>(&self, user: UserId, scope: ScopeId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut SubscriptionRecord),
    {
        let mut record = self
            .get_subscription(user, scope)
            .await?
            .unwrap_or_else(|| SubscriptionRecord::new(user, scope));
        apply(&mut record);
        record.updated_at = Utc::now();
        self.upsert(&record).await
    }

    async fn upsert_guild_settings(&self, settings: &GuildSettings) -> Result<()> {
        let conn = self.db.get_connection().await?;
        let data = serde_json::to_string(settings).map_err(|e| NotifierError::Store {
            message: format!("Failed to serialize guild settings: {e}"),
        })?;

        conn.execute(
            "INSERT INTO guild_settings (scope_id, data, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(scope_id) DO UPDATE SET
               data = excluded.data,
               updated_at = excluded.updated_at",
            libsql::params![settings.scope.0 as i64, data],
        )
        .await
        .map_err(|e| NotifierError::Store {
            message: format!("Failed to upsert guild settings: {e}"),
        })?;

        Ok(())
    }

    async fn update_guild_settings<F>(&self, scope: ScopeId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut GuildSettings),
    {
        let mut settings = self
            .get_guild_settings(scope)
            .await?
            .unwrap_or_else(|| GuildSettings::new(scope));
        apply(&mut settings);
        settings.updated_at = Utc::now();
        self.upsert_guild_settings(&settings).await
    }
}

#[async_trait]
impl SubscriptionStore for DatabaseStorage {
    async fn list_collections(&self, scope: ScopeId) -> Result<Vec<CollectionRecord>> {
        Ok(self
            .load_scope(scope)
            .await?
            .into_iter()
            .filter(|r| !r.collection.is_empty())
            .map(|r| CollectionRecord {
                user: r.user,
                scope: r.scope,
                names: r.collection,
            })
            .collect())
    }

    async fn list_hunts(&self, scope: ScopeId) -> Result<Vec<HuntRecord>> {
        Ok(self
            .load_scope(scope)
            .await?
            .into_iter()
            .filter_map(|r| {
                let user = r.user;
                let scope = r.scope;
                r.hunt_target.map(|target| HuntRecord { user, scope, target })
            })
            .collect())
    }

    async fn list_flagged(&self, scope: ScopeId, flag: FlagKind) -> Result<HashSet<UserId>> {
        Ok(self
            .load_scope(scope)
            .await?
            .into_iter()
            .filter(|r| r.flag(flag))
            .map(|r| r.user)
            .collect())
    }

    async fn get_subscription(
        &self,
        user: UserId,
        scope: ScopeId,
    ) -> Result<Option<SubscriptionRecord>> {
        let conn = self.db.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT data FROM subscriptions WHERE user_id = ?1 AND scope_id = ?2",
                libsql::params![user.0 as i64, scope.0 as i64],
            )
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to query subscription: {e}"),
            })?;

        if let Some(row) = rows.next().await.map_err(|e| NotifierError::Store {
            message: format!("Failed to read row: {e}"),
        })? {
            let data: String = row.get(0).map_err(|e| NotifierError::Store {
                message: format!("Failed to get data: {e}"),
            })?;
            Ok(Some(Self::row_data_to_record(&data)?))
        } else {
            Ok(None)
        }
    }

    async fn get_guild_settings(&self, scope: ScopeId) -> Result<Option<GuildSettings>> {
        let conn = self.db.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT data FROM guild_settings WHERE scope_id = ?1",
                libsql::params![scope.0 as i64],
            )
            .await
            .map_err(|e| NotifierError::Store {
                message: format!("Failed to query guild settings: {e}"),
            })?;

        if let Some(row) = rows.next().await.map_err(|e| NotifierError::Store {
            message: format!("Failed to read row: {e}"),
        })? {
            let data: String = row.get(0).map_err(|e| NotifierError::Store {
                message: format!("Failed to get data: {e}"),
            })?;
            let settings = serde_json::from_str(&data).map_err(|e| NotifierError::Store {
                message: format!("Failed to deserialize guild settings: {e}"),
            })?;
            Ok(Some(settings))
        } else {
            Ok(None)
        }
    }

    async fn add_to_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        names: &[String],
    ) -> Result<()> {
        self.update_record(user, scope, |record| {
            record.collection.extend(names.iter().cloned());
        })
        .await
    }

    async fn remove_from_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        names: &[String],
    ) -> Result<usize> {
        let mut removed = 0;
        self.update_record(user, scope, |record| {
            for name in names {
                if record.collection.remove(name) {
                    removed += 1;
                }
            }
        })
        .await?;
        Ok(removed)
    }

    async fn clear_collection(&self, user: UserId, scope: ScopeId) -> Result<bool> {
        let mut had_any = false;
        self.update_record(user, scope, |record| {
            had_any = !record.collection.is_empty();
            record.collection.clear();
        })
        .await?;
        Ok(had_any)
    }

    async fn set_hunt(&self, user: UserId, scope: ScopeId, target: &str) -> Result<()> {
        self.update_record(user, scope, |record| {
            record.hunt_target = Some(target.to_string());
        })
        .await
    }

    async fn clear_hunt(&self, user: UserId, scope: ScopeId) -> Result<bool> {
        let mut had_hunt = false;
        self.update_record(user, scope, |record| {
            had_hunt = record.hunt_target.take().is_some();
        })
        .await?;
        Ok(had_hunt)
    }

    async fn set_flag(
        &self,
        user: UserId,
        scope: ScopeId,
        flag: FlagKind,
        enabled: bool,
    ) -> Result<()> {
        self.update_record(user, scope, |record| {
            record.set_flag(flag, enabled);
        })
        .await
    }

    async fn set_rare_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
        self.update_guild_settings(scope, |settings| {
            settings.rare_role = role;
        })
        .await
    }

    async fn set_regional_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
        self.update_guild_settings(scope, |settings| {
            settings.regional_role = role;
        })
        .await
    }
}
