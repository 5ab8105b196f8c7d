//! Spawn recipient resolution.
//!
//! One call per spawn event: match the raw name against the catalog, read
//! the scope's subscriptions, and produce the ordered recipient lists. Store
//! failures degrade per category; nothing on this path is fatal.

use crate::catalog::{normalize, EntityCatalog};
use crate::observability::metrics;
use spawnwatch_core::common::error::Result;
use spawnwatch_core::domain::{CanonicalEntity, FlagKind, Rarity, RoleId, ScopeId, UserId};
use spawnwatch_core::storage::SubscriptionStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// One matched hunter. A shiny-hunt-AFK hunter stays in the list; the flag
/// only tells the caller to render the entry without an active mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunter {
    pub user: UserId,
    pub is_afk: bool,
}

/// Recipient sets for one spawn event.
///
/// `collectors` already includes the rare-ping fan-in, deduplicated;
/// `rare_pings` carries the fan-in subset on its own for callers that render
/// it separately. A user may appear in both `collectors` and `hunters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnRecipients {
    pub collectors: Vec<UserId>,
    pub hunters: Vec<Hunter>,
    pub rare_pings: Vec<UserId>,
}

impl SpawnRecipients {
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty() && self.hunters.is_empty() && self.rare_pings.is_empty()
    }
}

/// Role to ping for a spawn, per the scope's configured settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePing {
    Rare(RoleId),
    Regional(RoleId),
}

/// Pure resolution engine over an injected catalog snapshot and store.
///
/// Holds no mutable state; safe to share and call concurrently.
pub struct NotificationResolver {
    catalog: Arc<EntityCatalog>,
    store: Arc<dyn SubscriptionStore>,
}

impl NotificationResolver {
    pub fn new(catalog: Arc<EntityCatalog>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self { catalog, store }
    }

    /// Resolve all recipients for one spawn event.
    ///
    /// An unresolvable name is a parse-miss, not an error: the result is
    /// empty and the caller simply has nobody to notify.
    pub async fn resolve_spawn_recipients(
        &self,
        raw_name: &str,
        scope: ScopeId,
    ) -> SpawnRecipients {
        let Some(target) = self.catalog.resolve(raw_name) else {
            debug!(%scope, raw_name, "spawn name not in catalog; skipping");
            metrics::resolver::parse_miss();
            return SpawnRecipients::default();
        };

        // Match set: the spawned entity plus its single-hop base. Collecting
        // the base matches a variant spawn; the reverse does not hold.
        let mut match_set: HashSet<String> = HashSet::new();
        match_set.insert(normalize(&target.name));
        if let Some(base) = self.catalog.base_of(target) {
            match_set.insert(normalize(&base.name));
        }

        // Independent reads per category; one failing category degrades to
        // empty without touching the others
        let (collections, hunts, collection_afk, shiny_hunt_afk, rare_ping_users) = tokio::join!(
            self.store.list_collections(scope),
            self.store.list_hunts(scope),
            self.store.list_flagged(scope, FlagKind::CollectionAfk),
            self.store.list_flagged(scope, FlagKind::ShinyHuntAfk),
            self.rare_ping_set(target, scope),
        );

        let collections = degrade_to_default(collections, "collections", scope);
        let hunts = degrade_to_default(hunts, "hunts", scope);
        let collection_afk = degrade_to_default(collection_afk, "collection_afk", scope);
        let shiny_hunt_afk = degrade_to_default(shiny_hunt_afk, "shiny_hunt_afk", scope);
        let rare_ping_users = degrade_to_default(rare_ping_users, "rare_pings", scope);

        // Collectors: any stored name normalizing into the match set, minus
        // collection-AFK users, first-seen order from the store
        let mut collectors = Vec::new();
        let mut seen = HashSet::new();
        for record in &collections {
            if collection_afk.contains(&record.user) {
                continue;
            }
            if record.names.iter().any(|n| match_set.contains(&normalize(n))) && seen.insert(record.user)
            {
                collectors.push(record.user);
            }
        }

        // Rare-ping fan-in joins the collector list, minus collection-AFK
        // users, deduplicated against the direct collectors
        let mut rare_pings: Vec<UserId> = rare_ping_users
            .into_iter()
            .filter(|user| !collection_afk.contains(user))
            .collect();
        rare_pings.sort();
        for user in &rare_pings {
            if seen.insert(*user) {
                collectors.push(*user);
            }
        }

        // Hunters: shiny-hunt AFK marks the entry instead of removing it
        let hunters: Vec<Hunter> = hunts
            .iter()
            .filter(|hunt| match_set.contains(&normalize(&hunt.target)))
            .map(|hunt| Hunter {
                user: hunt.user,
                is_afk: shiny_hunt_afk.contains(&hunt.user),
            })
            .collect();

        metrics::resolver::spawn_resolved();
        debug!(
            %scope,
            entity = %target.name,
            collectors = collectors.len(),
            hunters = hunters.len(),
            rare_pings = rare_pings.len(),
            "resolved spawn recipients"
        );

        SpawnRecipients {
            collectors,
            hunters,
            rare_pings,
        }
    }

    /// Role to ping for this spawn, if the scope configured one for the
    /// entity's tier. Store failures resolve to no ping.
    pub async fn resolve_role_ping(&self, raw_name: &str, scope: ScopeId) -> Option<RolePing> {
        let target = self.catalog.resolve(raw_name)?;

        let settings = match self.store.get_guild_settings(scope).await {
            Ok(settings) => settings?,
            Err(err) => {
                warn!(%scope, category = "guild_settings", error = %err, "subscription store read failed; continuing with empty result");
                metrics::resolver::store_degraded("guild_settings");
                return None;
            }
        };

        if target.rarity.is_rare() {
            settings.rare_role.map(RolePing::Rare)
        } else if target.rarity == Rarity::Regional {
            settings.regional_role.map(RolePing::Regional)
        } else {
            None
        }
    }

    /// Validate a raw name against the catalog. Reused by mutation commands
    /// before they persist anything.
    pub fn resolve_entity(&self, raw_name: &str) -> Option<&CanonicalEntity> {
        self.catalog.resolve(raw_name)
    }

    async fn rare_ping_set(
        &self,
        target: &CanonicalEntity,
        scope: ScopeId,
    ) -> Result<HashSet<UserId>> {
        if target.rarity.is_rare() {
            self.store.list_flagged(scope, FlagKind::RarePing).await
        } else {
            Ok(HashSet::new())
        }
    }
}

fn degrade_to_default<T: Default>(result: Result<T>, category: &str, scope: ScopeId) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(%scope, category, error = %err, "subscription store read failed; continuing with empty result");
            metrics::resolver::store_degraded(category);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spawnwatch_core::common::error::NotifierError;
    use spawnwatch_core::domain::*;
    use spawnwatch_core::storage::MemoryStorage;

    const SCOPE: ScopeId = ScopeId(100);

    fn catalog() -> Arc<EntityCatalog> {
        let entities = vec![
            CanonicalEntity {
                name: "Pikachu".to_string(),
                aliases: vec!["chu".to_string()],
                variant_of: None,
                rarity: Rarity::Common,
            },
            CanonicalEntity {
                name: "Pikachu (Cosplay)".to_string(),
                aliases: Vec::new(),
                variant_of: Some("Pikachu".to_string()),
                rarity: Rarity::Common,
            },
            CanonicalEntity {
                name: "Mewtwo".to_string(),
                aliases: Vec::new(),
                variant_of: None,
                rarity: Rarity::Legendary,
            },
            CanonicalEntity {
                name: "Kangaskhan".to_string(),
                aliases: Vec::new(),
                variant_of: None,
                rarity: Rarity::Regional,
            },
        ];
        Arc::new(EntityCatalog::from_entities(entities).unwrap())
    }

    fn resolver_with(store: Arc<dyn SubscriptionStore>) -> NotificationResolver {
        NotificationResolver::new(catalog(), store)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unresolvable_name_yields_empty_result() {
        let store = Arc::new(MemoryStorage::new());
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("MissingNo", SCOPE).await;
        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_collector_matches_by_alias_and_case() {
        let store = Arc::new(MemoryStorage::new());
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("CHU", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(1)]);
        assert!(recipients.hunters.is_empty());
    }

    #[tokio::test]
    async fn test_variant_rule_is_directional() {
        let store = Arc::new(MemoryStorage::new());
        // A collects the base, B collects the variant
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        store
            .add_to_collection(UserId(2), SCOPE, &names(&["Pikachu (Cosplay)"]))
            .await
            .unwrap();
        let resolver = resolver_with(store);

        // Variant spawn reaches both the variant collector and the base collector
        let variant_spawn = resolver
            .resolve_spawn_recipients("Pikachu (Cosplay)", SCOPE)
            .await;
        assert_eq!(variant_spawn.collectors, vec![UserId(1), UserId(2)]);

        // Base spawn does not reach the variant-only collector
        let base_spawn = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert_eq!(base_spawn.collectors, vec![UserId(1)]);
    }

    #[tokio::test]
    async fn test_collection_afk_excludes_collector() {
        let store = Arc::new(MemoryStorage::new());
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        store
            .add_to_collection(UserId(2), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        store
            .set_flag(UserId(1), SCOPE, FlagKind::CollectionAfk, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(2)]);
    }

    #[tokio::test]
    async fn test_shiny_hunt_afk_marks_but_keeps_hunter() {
        let store = Arc::new(MemoryStorage::new());
        store.set_hunt(UserId(1), SCOPE, "Pikachu").await.unwrap();
        store.set_hunt(UserId(2), SCOPE, "Pikachu").await.unwrap();
        store
            .set_flag(UserId(1), SCOPE, FlagKind::ShinyHuntAfk, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert_eq!(
            recipients.hunters,
            vec![
                Hunter { user: UserId(1), is_afk: true },
                Hunter { user: UserId(2), is_afk: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_hunter_matches_base_of_variant_spawn() {
        let store = Arc::new(MemoryStorage::new());
        store.set_hunt(UserId(1), SCOPE, "Pikachu").await.unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver
            .resolve_spawn_recipients("Pikachu (Cosplay)", SCOPE)
            .await;
        assert_eq!(
            recipients.hunters,
            vec![Hunter { user: UserId(1), is_afk: false }]
        );
    }

    #[tokio::test]
    async fn test_rare_ping_fan_in_dedupes_against_collectors() {
        let store = Arc::new(MemoryStorage::new());
        // User 1 both collects Mewtwo and has rare pings on
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Mewtwo"]))
            .await
            .unwrap();
        store
            .set_flag(UserId(1), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        store
            .set_flag(UserId(2), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Mewtwo", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(1), UserId(2)]);
        assert_eq!(recipients.rare_pings, vec![UserId(1), UserId(2)]);
    }

    #[tokio::test]
    async fn test_no_rare_fan_in_for_common_spawn() {
        let store = Arc::new(MemoryStorage::new());
        store
            .set_flag(UserId(2), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert!(recipients.collectors.is_empty());
        assert!(recipients.rare_pings.is_empty());
    }

    #[tokio::test]
    async fn test_collection_afk_beats_rare_ping() {
        let store = Arc::new(MemoryStorage::new());
        store
            .set_flag(UserId(1), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        store
            .set_flag(UserId(1), SCOPE, FlagKind::CollectionAfk, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Mewtwo", SCOPE).await;
        assert!(recipients.collectors.is_empty());
        assert!(recipients.rare_pings.is_empty());
    }

    #[tokio::test]
    async fn test_shiny_hunt_afk_does_not_affect_rare_pings() {
        let store = Arc::new(MemoryStorage::new());
        store
            .set_flag(UserId(1), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        store
            .set_flag(UserId(1), SCOPE, FlagKind::ShinyHuntAfk, true)
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Mewtwo", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(1)]);
        assert_eq!(recipients.rare_pings, vec![UserId(1)]);
    }

    #[tokio::test]
    async fn test_user_can_be_collector_and_hunter() {
        let store = Arc::new(MemoryStorage::new());
        store
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        store.set_hunt(UserId(1), SCOPE, "Pikachu").await.unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(1)]);
        assert_eq!(
            recipients.hunters,
            vec![Hunter { user: UserId(1), is_afk: false }]
        );
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let store = Arc::new(MemoryStorage::new());
        store
            .add_to_collection(UserId(1), ScopeId(200), &names(&["Pikachu"]))
            .await
            .unwrap();
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_deterministic_across_repeated_calls() {
        let store = Arc::new(MemoryStorage::new());
        for id in [5u64, 3, 9, 1] {
            store
                .add_to_collection(UserId(id), SCOPE, &names(&["Mewtwo"]))
                .await
                .unwrap();
        }
        store
            .set_flag(UserId(7), SCOPE, FlagKind::RarePing, true)
            .await
            .unwrap();
        store.set_hunt(UserId(2), SCOPE, "Mewtwo").await.unwrap();
        let resolver = resolver_with(store);

        let first = resolver.resolve_spawn_recipients("Mewtwo", SCOPE).await;
        for _ in 0..5 {
            let again = resolver.resolve_spawn_recipients("Mewtwo", SCOPE).await;
            assert_eq!(again, first);
        }
        assert_eq!(
            first.collectors,
            vec![UserId(1), UserId(3), UserId(5), UserId(9), UserId(7)]
        );
    }

    #[tokio::test]
    async fn test_role_ping_per_rarity_tier() {
        let store = Arc::new(MemoryStorage::new());
        store.set_rare_role(SCOPE, Some(RoleId(11))).await.unwrap();
        store
            .set_regional_role(SCOPE, Some(RoleId(22)))
            .await
            .unwrap();
        let resolver = resolver_with(store);

        assert_eq!(
            resolver.resolve_role_ping("Mewtwo", SCOPE).await,
            Some(RolePing::Rare(RoleId(11)))
        );
        assert_eq!(
            resolver.resolve_role_ping("Kangaskhan", SCOPE).await,
            Some(RolePing::Regional(RoleId(22)))
        );
        assert_eq!(resolver.resolve_role_ping("Pikachu", SCOPE).await, None);
        assert_eq!(
            resolver.resolve_role_ping("Mewtwo", ScopeId(999)).await,
            None
        );
    }

    /// Store whose list methods fail for chosen categories.
    struct FlakyStore {
        inner: MemoryStorage,
        fail_collections: bool,
        fail_hunts: bool,
        fail_flags: bool,
    }

    impl FlakyStore {
        fn failing_collections(inner: MemoryStorage) -> Self {
            Self { inner, fail_collections: true, fail_hunts: false, fail_flags: false }
        }

        fn failing_flags(inner: MemoryStorage) -> Self {
            Self { inner, fail_collections: false, fail_hunts: false, fail_flags: true }
        }

        fn unavailable(category: &str) -> NotifierError {
            NotifierError::Store {
                message: format!("{category} unavailable"),
            }
        }
    }

    #[async_trait]
    impl SubscriptionStore for FlakyStore {
        async fn list_collections(&self, scope: ScopeId) -> Result<Vec<CollectionRecord>> {
            if self.fail_collections {
                return Err(Self::unavailable("collections"));
            }
            self.inner.list_collections(scope).await
        }

        async fn list_hunts(&self, scope: ScopeId) -> Result<Vec<HuntRecord>> {
            if self.fail_hunts {
                return Err(Self::unavailable("hunts"));
            }
            self.inner.list_hunts(scope).await
        }

        async fn list_flagged(
            &self,
            scope: ScopeId,
            flag: FlagKind,
        ) -> Result<HashSet<UserId>> {
            if self.fail_flags {
                return Err(Self::unavailable("flags"));
            }
            self.inner.list_flagged(scope, flag).await
        }

        async fn get_subscription(
            &self,
            user: UserId,
            scope: ScopeId,
        ) -> Result<Option<SubscriptionRecord>> {
            self.inner.get_subscription(user, scope).await
        }

        async fn get_guild_settings(&self, _scope: ScopeId) -> Result<Option<GuildSettings>> {
            Err(Self::unavailable("guild_settings"))
        }

        async fn add_to_collection(
            &self,
            user: UserId,
            scope: ScopeId,
            names: &[String],
        ) -> Result<()> {
            self.inner.add_to_collection(user, scope, names).await
        }

        async fn remove_from_collection(
            &self,
            user: UserId,
            scope: ScopeId,
            names: &[String],
        ) -> Result<usize> {
            self.inner.remove_from_collection(user, scope, names).await
        }

        async fn clear_collection(&self, user: UserId, scope: ScopeId) -> Result<bool> {
            self.inner.clear_collection(user, scope).await
        }

        async fn set_hunt(&self, user: UserId, scope: ScopeId, target: &str) -> Result<()> {
            self.inner.set_hunt(user, scope, target).await
        }

        async fn clear_hunt(&self, user: UserId, scope: ScopeId) -> Result<bool> {
            self.inner.clear_hunt(user, scope).await
        }

        async fn set_flag(
            &self,
            user: UserId,
            scope: ScopeId,
            flag: FlagKind,
            enabled: bool,
        ) -> Result<()> {
            self.inner.set_flag(user, scope, flag, enabled).await
        }

        async fn set_rare_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
            self.inner.set_rare_role(scope, role).await
        }

        async fn set_regional_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
            self.inner.set_regional_role(scope, role).await
        }
    }

    #[tokio::test]
    async fn test_failed_collections_read_leaves_hunters_intact() {
        let inner = MemoryStorage::new();
        inner
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        inner.set_hunt(UserId(2), SCOPE, "Pikachu").await.unwrap();

        let store = Arc::new(FlakyStore::failing_collections(inner));
        let resolver = resolver_with(store);

        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert!(recipients.collectors.is_empty());
        assert_eq!(
            recipients.hunters,
            vec![Hunter { user: UserId(2), is_afk: false }]
        );
    }

    #[tokio::test]
    async fn test_failed_flag_read_degrades_to_no_exclusions() {
        let inner = MemoryStorage::new();
        inner
            .add_to_collection(UserId(1), SCOPE, &names(&["Pikachu"]))
            .await
            .unwrap();
        inner
            .set_flag(UserId(1), SCOPE, FlagKind::CollectionAfk, true)
            .await
            .unwrap();

        let store = Arc::new(FlakyStore::failing_flags(inner));
        let resolver = resolver_with(store);

        // With the AFK set unreadable nobody is excluded
        let recipients = resolver.resolve_spawn_recipients("Pikachu", SCOPE).await;
        assert_eq!(recipients.collectors, vec![UserId(1)]);
    }

    #[tokio::test]
    async fn test_failed_settings_read_means_no_role_ping() {
        let inner = MemoryStorage::new();
        let store = Arc::new(FlakyStore::failing_flags(inner));
        let resolver = resolver_with(store);

        assert_eq!(resolver.resolve_role_ping("Mewtwo", SCOPE).await, None);
    }
}
