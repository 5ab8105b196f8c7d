use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use uuid::Uuid;

/// Snowflake id of a subscribed user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Snowflake id of the community (guild) a subscription belongs to.
/// All subscription records and spawn events are namespaced by scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ScopeId(pub u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScopeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Snowflake id of a pingable role configured per scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Rarity tier of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Regional,
    Legendary,
    Mythical,
    UltraBeast,
}

impl Default for Rarity {
    fn default() -> Self {
        Rarity::Common
    }
}

impl Rarity {
    /// Tiers that trigger the rare-ping fan-in.
    pub fn is_rare(self) -> bool {
        matches!(self, Rarity::Legendary | Rarity::Mythical | Rarity::UltraBeast)
    }
}

/// Authoritative record for one collectible name.
///
/// `variant_of` links an alternate form to its base entity by primary name,
/// one hop only. The catalog rejects dangling or chained links at load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub variant_of: Option<String>,
    #[serde(default)]
    pub rarity: Rarity,
}

/// Per-user opt-out/opt-in flags, one record each per (user, scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    CollectionAfk,
    ShinyHuntAfk,
    RarePing,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagKind::CollectionAfk => "collection_afk",
            FlagKind::ShinyHuntAfk => "shiny_hunt_afk",
            FlagKind::RarePing => "rare_ping",
        };
        write!(f, "{name}")
    }
}

/// One user's full subscription document for a scope.
///
/// Missing fields in stored documents default here, at the adapter boundary,
/// so resolution logic never sees a partial record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user: UserId,
    pub scope: ScopeId,
    /// Canonical names the user collects. Set semantics.
    #[serde(default)]
    pub collection: BTreeSet<String>,
    /// At most one active hunt target; setting a new one replaces it.
    #[serde(default)]
    pub hunt_target: Option<String>,
    #[serde(default)]
    pub collection_afk: bool,
    #[serde(default)]
    pub shiny_hunt_afk: bool,
    #[serde(default)]
    pub rare_ping: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn new(user: UserId, scope: ScopeId) -> Self {
        let now = Utc::now();
        Self {
            id: Some(Uuid::new_v4()),
            user,
            scope,
            collection: BTreeSet::new(),
            hunt_target: None,
            collection_afk: false,
            shiny_hunt_afk: false,
            rare_ping: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn flag(&self, kind: FlagKind) -> bool {
        match kind {
            FlagKind::CollectionAfk => self.collection_afk,
            FlagKind::ShinyHuntAfk => self.shiny_hunt_afk,
            FlagKind::RarePing => self.rare_ping,
        }
    }

    pub fn set_flag(&mut self, kind: FlagKind, enabled: bool) {
        match kind {
            FlagKind::CollectionAfk => self.collection_afk = enabled,
            FlagKind::ShinyHuntAfk => self.shiny_hunt_afk = enabled,
            FlagKind::RarePing => self.rare_ping = enabled,
        }
    }
}

/// Read-side view of one user's collection in a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub user: UserId,
    pub scope: ScopeId,
    pub names: BTreeSet<String>,
}

/// Read-side view of one user's active hunt in a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntRecord {
    pub user: UserId,
    pub scope: ScopeId,
    pub target: String,
}

/// Per-scope role configuration for rare/regional spawn pings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSettings {
    pub scope: ScopeId,
    #[serde(default)]
    pub rare_role: Option<RoleId>,
    #[serde(default)]
    pub regional_role: Option<RoleId>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl GuildSettings {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            rare_role: None,
            regional_role: None,
            updated_at: Utc::now(),
        }
    }
}
