//! Franchise authorization CLI
//!
//! Inspects the compiled-in policy and evaluates request intents from JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use franchise_authz::clock::SystemClock;
use franchise_authz::hierarchy::Role;
use franchise_authz::permissions::ConstraintKey;
use franchise_authz::{AccessRequest, AuthorizationGuard, GuardConfig};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Franchise authorization CLI
#[derive(Parser)]
#[command(name = "authz-cli")]
#[command(about = "Inspect the RBAC policy and evaluate request intents")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "AUTHZ_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List roles with level, scope and inheritance chain
    Roles,

    /// List a role's permissions and constraint limits
    Permissions {
        /// Role name, e.g. BOLTVEZETO
        role: String,

        /// Only permissions granted directly
        #[arg(long)]
        direct: bool,
    },

    /// Evaluate a request intent read from a JSON file ("-" for stdin)
    Check {
        intent: PathBuf,

        /// Treat the subject as freshly re-verified
        #[arg(long)]
        elevated: bool,

        /// Exit with status 1 when denied
        #[arg(long)]
        fail_on_deny: bool,
    },

    /// List registered operations
    Operations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},audit=info", log_level).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = match &cli.config {
        Some(path) => GuardConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GuardConfig::default(),
    };

    let guard = config
        .build_guard(Arc::new(SystemClock))
        .context("Failed to build authorization guard")?;
    debug!("{:?}", guard);

    match cli.command {
        Command::Roles => print_roles(&guard)?,
        Command::Permissions { role, direct } => print_permissions(&guard, &role, direct)?,
        Command::Check {
            intent,
            elevated,
            fail_on_deny,
        } => {
            let allowed = check(&guard, &intent, elevated)?;
            if fail_on_deny && !allowed {
                std::process::exit(1);
            }
        }
        Command::Operations => print_operations(&guard)?,
    }

    Ok(())
}

fn print_roles(guard: &AuthorizationGuard) -> Result<()> {
    let hierarchy = guard.hierarchy();
    let mut roles: Vec<Role> = hierarchy.roles().collect();
    roles.sort_by_key(|r| hierarchy.level_of(*r).unwrap_or_default());

    println!("{:<14} {:>5}  {:<8}  INHERITS", "ROLE", "LEVEL", "SCOPE");
    for role in roles {
        let chain = hierarchy
            .inherited_chain(role)?
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(" > ");
        println!(
            "{:<14} {:>5}  {:<8}  {}",
            role,
            hierarchy.level_of(role)?,
            hierarchy.scope_of(role)?,
            if chain.is_empty() { "-" } else { &chain }
        );
    }
    Ok(())
}

fn print_permissions(guard: &AuthorizationGuard, role: &str, direct: bool) -> Result<()> {
    let role: Role = role.parse()?;
    let composer = guard.composer();

    let mut permissions: Vec<_> = if direct {
        composer.direct_permissions(role).iter().copied().collect()
    } else {
        composer.all_permissions(role)?.iter().copied().collect()
    };
    permissions.sort();

    for permission in permissions {
        let limits = ConstraintKey::ALL
            .iter()
            .filter_map(|key| {
                composer
                    .resolve_constraint(role, permission, *key)
                    .ok()
                    .flatten()
                    .map(|limit| format!("{}={}", key, limit))
            })
            .collect::<Vec<_>>();

        if limits.is_empty() {
            println!("{}", permission);
        } else {
            println!("{:<24} {}", permission, limits.join(" "));
        }
    }
    Ok(())
}

fn check(guard: &AuthorizationGuard, intent: &Path, elevated: bool) -> Result<bool> {
    let raw = if intent.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read intent from stdin")?;
        buf
    } else {
        std::fs::read_to_string(intent)
            .with_context(|| format!("Failed to read {}", intent.display()))?
    };

    let request: AccessRequest =
        serde_json::from_str(&raw).context("Failed to parse request intent")?;

    if elevated {
        if let Some(subject) = &request.subject {
            guard.grant_elevated_access(subject);
        }
    }

    let decision = guard.authorize(&request);
    info!("Decision {}: allowed={}", decision.id, decision.allowed);

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(decision.allowed)
}

fn print_operations(guard: &AuthorizationGuard) -> Result<()> {
    for operation in guard.operations().iter() {
        let permissions = operation
            .required_permissions()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let scope = operation
            .scope()
            .map(|s| {
                format!(
                    "{}{}{}",
                    s.minimum,
                    if s.is_write { " write" } else { " read" },
                    if s.allow_global_write { " +global" } else { "" }
                )
            })
            .unwrap_or_else(|| "-".to_string());

        let elevated = operation
            .elevated_access()
            .map(|ttl| ttl.to_string())
            .unwrap_or_else(|| "-".to_string());

        let constraint = operation
            .constraint_spec()
            .map(|c| format!("{}{}", c.key, if c.use_absolute_value { " (abs)" } else { "" }))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<20} {:<36} {:<22} elevated={:<6} constraint={}",
            operation.name(),
            permissions,
            scope,
            elevated,
            constraint
        );
    }
    Ok(())
}
