//! Subscription mutation use cases.
//!
//! Every user-supplied name is validated against the catalog before anything
//! is persisted, and stored under its canonical primary name so the resolver
//! only ever compares canonical spellings.

use crate::catalog::EntityCatalog;
use crate::observability::metrics;
use spawnwatch_core::common::error::{NotifierError, Result};
use spawnwatch_core::domain::{FlagKind, RoleId, ScopeId, UserId};
use spawnwatch_core::storage::SubscriptionStore;
use std::sync::Arc;
use tracing::info;

/// Result of a collection mutation: which names were accepted (canonical
/// spelling) and which raw inputs had no catalog match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Mutation-side service over the same injected catalog and store the
/// resolver reads from.
pub struct SubscriptionService {
    catalog: Arc<EntityCatalog>,
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionService {
    pub fn new(catalog: Arc<EntityCatalog>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self { catalog, store }
    }

    /// Split raw inputs into canonical names and unmatched leftovers.
    fn canonicalize(&self, raw_names: &[String]) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();
        for raw in raw_names {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match self.catalog.resolve(raw) {
                Some(entity) => outcome.accepted.push(entity.name.clone()),
                None => outcome.rejected.push(raw.to_string()),
            }
        }
        outcome
    }

    /// Add entities to a user's collection. Unknown names are reported in
    /// the outcome; a request with no valid name at all is an error.
    pub async fn add_to_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        raw_names: &[String],
    ) -> Result<MutationOutcome> {
        let outcome = self.canonicalize(raw_names);
        metrics::subscriptions::names_accepted(outcome.accepted.len());
        metrics::subscriptions::names_rejected(outcome.rejected.len());

        if outcome.accepted.is_empty() {
            return Err(NotifierError::EntityNotFound(outcome.rejected.join(", ")));
        }

        self.store
            .add_to_collection(user, scope, &outcome.accepted)
            .await?;
        info!(%user, %scope, added = outcome.accepted.len(), "collection updated");
        Ok(outcome)
    }

    /// Remove entities from a user's collection.
    pub async fn remove_from_collection(
        &self,
        user: UserId,
        scope: ScopeId,
        raw_names: &[String],
    ) -> Result<MutationOutcome> {
        let outcome = self.canonicalize(raw_names);
        metrics::subscriptions::names_rejected(outcome.rejected.len());

        if outcome.accepted.is_empty() {
            return Err(NotifierError::EntityNotFound(outcome.rejected.join(", ")));
        }

        let removed = self
            .store
            .remove_from_collection(user, scope, &outcome.accepted)
            .await?;
        info!(%user, %scope, removed, "collection updated");
        Ok(outcome)
    }

    /// Returns false if the collection was already empty.
    pub async fn clear_collection(&self, user: UserId, scope: ScopeId) -> Result<bool> {
        self.store.clear_collection(user, scope).await
    }

    /// The user's collection, canonical names in sorted order.
    pub async fn list_collection(&self, user: UserId, scope: ScopeId) -> Result<Vec<String>> {
        Ok(self
            .store
            .get_subscription(user, scope)
            .await?
            .map(|record| record.collection.into_iter().collect())
            .unwrap_or_default())
    }

    /// Set the user's single hunt target, replacing any previous one.
    /// Returns the canonical name now hunted.
    pub async fn set_hunt(
        &self,
        user: UserId,
        scope: ScopeId,
        raw_name: &str,
    ) -> Result<String> {
        let entity = self
            .catalog
            .resolve(raw_name)
            .ok_or_else(|| NotifierError::EntityNotFound(raw_name.to_string()))?;

        self.store.set_hunt(user, scope, &entity.name).await?;
        info!(%user, %scope, target = %entity.name, "hunt target set");
        Ok(entity.name.clone())
    }

    /// Returns false if the user was not hunting anything.
    pub async fn clear_hunt(&self, user: UserId, scope: ScopeId) -> Result<bool> {
        self.store.clear_hunt(user, scope).await
    }

    pub async fn current_hunt(&self, user: UserId, scope: ScopeId) -> Result<Option<String>> {
        Ok(self
            .store
            .get_subscription(user, scope)
            .await?
            .and_then(|record| record.hunt_target))
    }

    /// Flip a flag and return its new state.
    pub async fn toggle_flag(
        &self,
        user: UserId,
        scope: ScopeId,
        flag: FlagKind,
    ) -> Result<bool> {
        let current = self
            .store
            .get_subscription(user, scope)
            .await?
            .map(|record| record.flag(flag))
            .unwrap_or(false);
        let enabled = !current;

        self.store.set_flag(user, scope, flag, enabled).await?;
        info!(%user, %scope, %flag, enabled, "flag toggled");
        Ok(enabled)
    }

    pub async fn set_rare_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
        self.store.set_rare_role(scope, role).await
    }

    pub async fn set_regional_role(&self, scope: ScopeId, role: Option<RoleId>) -> Result<()> {
        self.store.set_regional_role(scope, role).await
    }
}
