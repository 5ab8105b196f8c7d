use crate::common::error::Result;
use crate::domain::*;
use async_trait::async_trait;
use std::collections::HashSet;

/// Storage contract for subscription state, keyed by (user, scope).
///
/// The list methods back spawn resolution and must iterate in a stable order
/// (ascending user id) so identical store state yields identical recipient
/// lists. Callers on the resolution path treat any error as an empty result;
/// mutation callers propagate errors.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    // Spawn-resolution reads, each scoped to one community
    async fn list_collections(&self, scope: ScopeId) -> Result<Vec<CollectionRecord>>;
    async fn list_hunts(&self, scope: ScopeId) -> Result<Vec<HuntRecord>>;
    async fn list_flagged(&self, scope: ScopeId, flag: FlagKind) -> Result<HashSet<UserId>>;

    // Single-document reads
    async fn get_subscription(
        &self,
        user: UserId,
        scope: ScopeId,
    ) -> Result<Option<SubscriptionRecord>>;
    async fn get_guild_settings(&self, scope: ScopeId) -> Result<Option<GuildSettings>>;

    // Collection mutations. Names are canonical by the time they reach the
    // store; validation against the catalog happens in the use-case layer.
    async fn add_to_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        names: &[String],
    ) -> Result<()>;
    /// Returns how many names were actually removed.
    async fn remove_from_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        names: &[String],
    ) -> Result<usize>;
    /// Returns false if there was nothing to clear.
    async fn clear_collection(&self, user: UserId, scope: ScopeId) -> Result<bool>;

    // Hunt mutations
    async fn set_hunt(&self, user: UserId, scope: ScopeId, target: &str) -> Result<()>;
    /// Returns false if the user was not hunting anything.
    async fn clear_hunt(&self, user: UserId, scope: ScopeId) -> Result<bool>;

    // Flag mutations
    async fn set_flag(
        &self,
        user: UserId,
        scope: ScopeId,
        flag: FlagKind,
        enabled: bool,
    ) -> Result<()>;

    // Guild settings
    async fn set_rare_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()>;
    async fn set_regional_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()>;
}
