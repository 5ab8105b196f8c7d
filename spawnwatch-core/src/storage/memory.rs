use crate::common::error::Result;
use crate::domain::*;
use crate::storage::traits::SubscriptionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// In-memory subscription store.
///
/// Backs tests and local runs. Keys are (scope, user) in a BTreeMap so the
/// list methods iterate in ascending user id order, which the resolver's
/// determinism contract depends on.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<BTreeMap<(ScopeId, UserId), SubscriptionRecord>>,
    guilds: RwLock<BTreeMap<ScopeId, GuildSettings>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation to the (user, scope) record, creating it if absent.
    async fn update_record<F>(&self, user: UserId, scope: ScopeId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut SubscriptionRecord),
    {
        let mut records = self.records.write().await;
        let record = records
            .entry((scope, user))
            .or_insert_with(|| SubscriptionRecord::new(user, scope));
        apply(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStorage {
    async fn list_collections(&self, scope: ScopeId) -> Result<Vec<CollectionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .range((scope, UserId(u64::MIN))..=(scope, UserId(u64::MAX)))
            .filter(|(_, r)| !r.collection.is_empty())
            .map(|(_, r)| CollectionRecord {
                user: r.user,
                scope: r.scope,
                names: r.collection.clone(),
            })
            .collect())
    }

    async fn list_hunts(&self, scope: ScopeId) -> Result<Vec<HuntRecord>> {
        let records = self.records.read().await;
        Ok(records
            .range((scope, UserId(u64::MIN))..=(scope, UserId(u64::MAX)))
            .filter_map(|(_, r)| {
                r.hunt_target.as_ref().map(|target| HuntRecord {
                    user: r.user,
                    scope: r.scope,
                    target: target.clone(),
                })
            })
            .collect())
    }

    async fn list_flagged(&self, scope: ScopeId, flag: FlagKind) -> Result<HashSet<UserId>> {
        let records = self.records.read().await;
        Ok(records
            .range((scope, UserId(u64::MIN))..=(scope, UserId(u64::MAX)))
            .filter(|(_, r)| r.flag(flag))
            .map(|(_, r)| r.user)
            .collect())
    }

    async fn get_subscription(
        &self,
        user: UserId,
        scope: ScopeId,
    ) -> Result<Option<SubscriptionRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&(scope, user)).cloned())
    }

    async fn get_guild_settings(&self, scope: ScopeId) -> Result<Option<GuildSettings>> {
        let guilds = self.guilds.read().await;
        Ok(guilds.get(&scope).cloned())
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
            // Replaces any previous target; at most one hunt per (user, scope)
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
        let mut guilds = self.guilds.write().await;
        let settings = guilds
            .entry(scope)
            .or_insert_with(|| GuildSettings::new(scope));
        settings.rare_role = role;
        settings.updated_at = Utc::now();
        Ok(())
    }

    async fn set_regional_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
        let mut guilds = self.guilds.write().await;
        let settings = guilds
            .entry(scope)
            .or_insert_with(|| GuildSettings::new(scope));
        settings.regional_role = role;
        settings.updated_at = Utc::now();
        Ok(())
    }
}
