use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use albertox3::builtin::{register_builtin_extensions, scaffold_layout};
use albertox3::extensions::{discover_extensions, load_extensions, resolve_extensions, ExtensionRegistry};
use albertox3::permissions::{
    Permission, PermissionLevelResolver, PermissionLevels, PermissionModel, PermissionRow,
    PermissionService, RoleStrategy,
};
use albertox3::storage::{JsonFileStore, MemoryCache};
use albertox3::{CommandRegistry, Config};

#[derive(Parser)]
#[command(name = "albertox3")]
#[command(about = "Extension and permission core of the AlbertoX3 bot", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the folder layout of the built-in extensions
    Init {
        /// Extensions folder (defaults to the configured one)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// List discovered extensions and whether they are enabled
    Extensions {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Load all extensions and wait for Ctrl+C
    Run {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Inspect and change permission levels
    Permissions {
        #[command(subcommand)]
        action: PermissionAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum PermissionAction {
    /// List every stored permission
    List,
    /// Show the level of a permission (`extension.name`)
    Get { permission: String },
    /// Set the level of a permission by level number, name or alias
    Set { permission: String, level: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Config::load ran before the subscriber existed
    let config_path = Config::path();
    info!(
        path = %config_path.display(),
        found = config_path.exists(),
        extensions = %config.extensions_folder.display(),
        cache_ttl_secs = config.cache_ttl_secs,
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Version) | None => {
            println!("albertox3 {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { root }) => {
            let root = root.unwrap_or_else(|| config.extensions_folder.clone());
            let created = scaffold_layout(&root)?;
            println!("Created {} files under {}", created, root.display());
        }
        Some(Commands::Extensions { root }) => {
            let root = root.unwrap_or_else(|| config.extensions_folder.clone());
            list_extensions(&config, &root)?;
        }
        Some(Commands::Run { root }) => {
            let root = root.unwrap_or_else(|| config.extensions_folder.clone());
            run(&config, &root).await?;
        }
        Some(Commands::Permissions { action }) => {
            let service = permission_service(&config).await?;
            match action {
                PermissionAction::List => {
                    for row in service.all().await? {
                        let level = service
                            .levels()
                            .find(row.level)
                            .map(|l| l.name.clone())
                            .unwrap_or_else(|_| "<undeclared>".to_string());
                        println!("{:<32} {:>6}  {}", row.permission, row.level, level);
                    }
                }
                PermissionAction::Get { permission } => {
                    let permission = parse_permission(&permission)?;
                    let level = service.resolve(&permission).await?;
                    println!("{} -> {}", permission, level);
                }
                PermissionAction::Set { permission, level } => {
                    let permission = parse_permission(&permission)?;
                    let level = service.levels().parse(&level)?.clone();
                    service.set(&permission, &level).await?;
                    println!("{} -> {}", permission, level);
                }
            }
        }
    }

    Ok(())
}

/// Folder name of the extensions root, used as the package prefix.
fn folder_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn builtin_registry(root: &Path) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    register_builtin_extensions(&mut registry, &folder_name(root));
    registry
}

fn list_extensions(config: &Config, root: &Path) -> anyhow::Result<()> {
    let mut registry = builtin_registry(root);
    let inventory = config.inventory();
    let descriptors = discover_extensions(root)?;
    let resolution = resolve_extensions(&mut registry, inventory.as_ref(), &descriptors)?;

    let mut descriptors: Vec<_> = descriptors.iter().collect();
    descriptors.sort_by_key(|d| d.full_name());
    for descriptor in descriptors {
        let status = match resolution.disabled.get(descriptor) {
            Some(reason) => format!("disabled ({})", reason),
            None => "enabled".to_string(),
        };
        println!(
            "{:<32} {:<24} [{}]",
            descriptor.full_name(),
            status,
            descriptor.features
        );
    }
    Ok(())
}

async fn permission_service(config: &Config) -> anyhow::Result<Arc<PermissionService>> {
    let levels: Arc<PermissionLevels> = Arc::new(config.validate()?);
    let strategy = RoleStrategy::new(Arc::clone(&levels)).with_owner(config.owner_id);
    let resolver = Arc::new(PermissionLevelResolver::new(levels, Arc::new(strategy)));

    let store = JsonFileStore::<PermissionRow>::open(Config::db_dir()).await?;
    let model = PermissionModel::new(
        Arc::new(MemoryCache::new()),
        Arc::new(store),
        config.cache_ttl(),
    );
    Ok(Arc::new(PermissionService::new(
        model,
        config.permission_defaults(),
        resolver,
    )))
}

async fn run(config: &Config, root: &Path) -> anyhow::Result<()> {
    let mut registry = builtin_registry(root);
    let inventory = config.inventory();
    let permissions = permission_service(config).await?;
    let mut host = CommandRegistry::new();

    let resolution = load_extensions(
        root,
        &mut registry,
        inventory.as_ref(),
        &mut host,
        &permissions,
        config.owner_id,
    )?;
    info!(
        enabled = resolution.enabled.len(),
        commands = ?host.command_names(),
        "AlbertoX3 is ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

fn parse_permission(input: &str) -> anyhow::Result<Permission> {
    let (extension, name) = input
        .split_once('.')
        .with_context(|| format!("Permission '{}' is not of the form extension.name", input))?;
    Ok(Permission::new(extension, name))
}
