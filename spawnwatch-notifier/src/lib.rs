//! Spawn notification engine for SpawnWatch.
//!
//! Resolves a raw spawn name against the canonical entity catalog and fans
//! the event out to collectors, hunters, and rare-ping subscribers.

pub mod app;
pub mod catalog;
pub mod config;
pub mod observability;
pub mod resolver;

// Re-export commonly used types
pub use catalog::{normalize, EntityCatalog};
pub use resolver::{Hunter, NotificationResolver, RolePing, SpawnRecipients};
pub use spawnwatch_core::domain::{CanonicalEntity, Rarity, ScopeId, UserId};
