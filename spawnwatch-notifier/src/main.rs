use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use spawnwatch_core::domain::{FlagKind, Rarity, RoleId, ScopeId, UserId};
use spawnwatch_core::storage::{MemoryStorage, SubscriptionStore};
use spawnwatch_notifier::app::SubscriptionService;
use spawnwatch_notifier::catalog::load_catalog;
use spawnwatch_notifier::config::{NotifierConfig, StorageBackend};
use spawnwatch_notifier::observability::logging::init_logging;
use spawnwatch_notifier::resolver::{NotificationResolver, RolePing};

#[derive(Parser)]
#[command(name = "spawnwatch-notifier")]
#[command(about = "Spawn notification engine: catalog matching and subscription pings")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the notifier config file
    #[arg(long, default_value = "spawnwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve recipients for one spawn event
    Spawn {
        /// Raw entity name as produced by the classifier
        #[arg(long)]
        name: String,
        /// Community scope the event happened in
        #[arg(long)]
        scope: ScopeId,
        /// Classifier confidence for this event, in percent
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Check a raw name against the catalog
    Check {
        #[arg(long)]
        name: String,
    },
    /// Manage a user's collection
    Collect {
        #[command(subcommand)]
        action: CollectAction,
    },
    /// Manage a user's hunt target
    Hunt {
        #[command(subcommand)]
        action: HuntAction,
    },
    /// Toggle an AFK flag for a user
    Afk {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
        #[arg(long, value_enum)]
        kind: AfkKind,
    },
    /// Toggle rare pings for a user
    RarePing {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
    },
    /// Configure per-scope ping roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Subcommand)]
enum CollectAction {
    /// Add comma-separated names to the collection
    Add {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
        #[arg(long)]
        names: String,
    },
    /// Remove comma-separated names from the collection
    Remove {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
        #[arg(long)]
        names: String,
    },
    /// List the collection
    List {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
    },
    /// Clear the collection
    Clear {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
    },
}

#[derive(Subcommand)]
enum HuntAction {
    /// Set the hunt target, replacing any previous one
    Set {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
        #[arg(long)]
        name: String,
    },
    /// Stop hunting
    Clear {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
    },
    /// Show the current hunt target
    Show {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        scope: ScopeId,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Set or clear the rare-spawn ping role
    Rare {
        #[arg(long)]
        scope: ScopeId,
        #[arg(long)]
        role: Option<RoleId>,
    },
    /// Set or clear the regional-spawn ping role
    Regional {
        #[arg(long)]
        scope: ScopeId,
        #[arg(long)]
        role: Option<RoleId>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AfkKind {
    Collection,
    ShinyHunt,
}

impl From<AfkKind> for FlagKind {
    fn from(kind: AfkKind) -> Self {
        match kind {
            AfkKind::Collection => FlagKind::CollectionAfk,
            AfkKind::ShinyHunt => FlagKind::ShinyHuntAfk,
        }
    }
}

fn rarity_label(rarity: Rarity) -> &'static str {
    match rarity {
        Rarity::Common => "common",
        Rarity::Rare => "rare",
        Rarity::Regional => "regional",
        Rarity::Legendary => "legendary",
        Rarity::Mythical => "mythical",
        Rarity::UltraBeast => "ultra beast",
    }
}

fn join_users(users: &[UserId]) -> String {
    users
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn build_store(config: &NotifierConfig) -> anyhow::Result<Arc<dyn SubscriptionStore>> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "db")]
        StorageBackend::Database => {
            let db = Arc::new(spawnwatch_core::DatabaseManager::new().await?);
            db.run_migrations().await?;
            Ok(Arc::new(spawnwatch_core::storage::DatabaseStorage::new(db)))
        }
        #[cfg(not(feature = "db"))]
        StorageBackend::Database => {
            anyhow::bail!("config selects database storage but this build lacks the `db` feature")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    let config = NotifierConfig::load_or_default(&cli.config)?;
    let catalog = Arc::new(load_catalog(&config.catalog_path)?);
    let store = build_store(&config).await?;
    info!("Catalog ready with {} entities", catalog.len());

    let resolver = NotificationResolver::new(catalog.clone(), store.clone());
    let service = SubscriptionService::new(catalog, store);

    match cli.command {
        Commands::Spawn {
            name,
            scope,
            confidence,
        } => {
            if let Some(confidence) = confidence {
                if confidence < config.min_confidence {
                    println!(
                        "Skipping spawn: confidence {confidence:.1}% below gate {:.1}%",
                        config.min_confidence
                    );
                    return Ok(());
                }
            }

            match resolver.resolve_entity(&name) {
                Some(entity) => {
                    println!("Spawn: {} ({})", entity.name, rarity_label(entity.rarity))
                }
                None => {
                    println!("No catalog match for {name:?}; nobody to notify");
                    return Ok(());
                }
            }

            let recipients = resolver.resolve_spawn_recipients(&name, scope).await;
            println!("Collectors: {}", join_users(&recipients.collectors));
            let hunters = recipients
                .hunters
                .iter()
                .map(|h| {
                    if h.is_afk {
                        format!("{} (afk)", h.user)
                    } else {
                        h.user.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!("Hunters: {hunters}");
            println!("Rare pings: {}", join_users(&recipients.rare_pings));

            match resolver.resolve_role_ping(&name, scope).await {
                Some(RolePing::Rare(role)) => println!("Role ping: rare role {role}"),
                Some(RolePing::Regional(role)) => println!("Role ping: regional role {role}"),
                None => {}
            }
        }
        Commands::Check { name } => match resolver.resolve_entity(&name) {
            Some(entity) => {
                println!("{} ({})", entity.name, rarity_label(entity.rarity));
                if !entity.aliases.is_empty() {
                    println!("Aliases: {}", entity.aliases.join(", "));
                }
                if let Some(base) = &entity.variant_of {
                    println!("Variant of: {base}");
                }
            }
            None => println!("No catalog match for {name:?}"),
        },
        Commands::Collect { action } => match action {
            CollectAction::Add { user, scope, names } => {
                let outcome = service
                    .add_to_collection(user, scope, &split_names(&names))
                    .await?;
                println!("Added {}: {}", outcome.accepted.len(), outcome.accepted.join(", "));
                if !outcome.rejected.is_empty() {
                    println!("Unknown names: {}", outcome.rejected.join(", "));
                }
            }
            CollectAction::Remove { user, scope, names } => {
                let outcome = service
                    .remove_from_collection(user, scope, &split_names(&names))
                    .await?;
                println!("Removed: {}", outcome.accepted.join(", "));
                if !outcome.rejected.is_empty() {
                    println!("Unknown names: {}", outcome.rejected.join(", "));
                }
            }
            CollectAction::List { user, scope } => {
                let collection = service.list_collection(user, scope).await?;
                if collection.is_empty() {
                    println!("Collection is empty");
                } else {
                    println!("Collection ({}): {}", collection.len(), collection.join(", "));
                }
            }
            CollectAction::Clear { user, scope } => {
                if service.clear_collection(user, scope).await? {
                    println!("Collection cleared");
                } else {
                    println!("Collection was already empty");
                }
            }
        },
        Commands::Hunt { action } => match action {
            HuntAction::Set { user, scope, name } => {
                let target = service.set_hunt(user, scope, &name).await?;
                println!("Now hunting: {target}");
            }
            HuntAction::Clear { user, scope } => {
                if service.clear_hunt(user, scope).await? {
                    println!("Hunt cleared");
                } else {
                    println!("No active hunt");
                }
            }
            HuntAction::Show { user, scope } => match service.current_hunt(user, scope).await? {
                Some(target) => println!("Hunting: {target}"),
                None => println!("No active hunt"),
            },
        },
        Commands::Afk { user, scope, kind } => {
            let enabled = service.toggle_flag(user, scope, kind.into()).await?;
            println!(
                "{:?} AFK is now {}",
                kind,
                if enabled { "on" } else { "off" }
            );
        }
        Commands::RarePing { user, scope } => {
            let enabled = service.toggle_flag(user, scope, FlagKind::RarePing).await?;
            println!("Rare pings are now {}", if enabled { "on" } else { "off" });
        }
        Commands::Role { action } => match action {
            RoleAction::Rare { scope, role } => {
                service.set_rare_role(scope, role).await?;
                match role {
                    Some(role) => println!("Rare ping role set to {role}"),
                    None => println!("Rare ping role cleared"),
                }
            }
            RoleAction::Regional { scope, role } => {
                service.set_regional_role(scope, role).await?;
                match role {
                    Some(role) => println!("Regional ping role set to {role}"),
                    None => println!("Regional ping role cleared"),
                }
            }
        },
    }

    Ok(())
}
