use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use timesheet::authz::{ApprovalConfig, Decision, EntryAction, FixedClock, PermissionPolicy};
use timesheet::db::{CategoryStore, TeamStore, TimesheetStore, UserDirectory};
use timesheet::models::team::TeamRole;
use timesheet::models::user::{UserKey, UserProfile};

#[derive(Parser, Debug)]
#[command(author, version, about = "timesheet administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Manage users known to the identity directory
    #[command(subcommand)]
    User(UserCommand),
    /// Manage teams and their members
    #[command(subcommand)]
    Team(TeamCommand),
    /// Manage entry categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Evaluate a permission decision against the database
    #[command(subcommand)]
    Check(CheckCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create or replace a user
    Add {
        #[arg(long)]
        key: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        admin: bool,
        #[arg(long = "group")]
        groups: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TeamCommand {
    Add { name: String },
    Remove { name: String },
    List,
    /// Attach a user to a team
    Member {
        team: String,
        user_key: String,
        #[arg(long)]
        coordinator: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Add { name: String },
    Remove { name: String },
    List,
}

#[derive(Args, Debug)]
struct CheckTarget {
    /// Username of the acting user
    #[arg(long)]
    actor: String,
    /// Evaluate as of this instant (RFC3339) instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Subcommand, Debug)]
enum CheckCommand {
    View {
        #[command(flatten)]
        target: CheckTarget,
        #[arg(long)]
        sheet: Uuid,
    },
    Edit {
        #[command(flatten)]
        target: CheckTarget,
        #[arg(long)]
        entry: Uuid,
    },
    Delete {
        #[command(flatten)]
        target: CheckTarget,
        #[arg(long)]
        entry: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fall back to the crate-local `.env` when the CWD has none.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = get_pool().await?;

    match cli.command {
        Commands::MigrateRun => {
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::User(command) => run_user(&pool, command).await?,
        Commands::Team(command) => run_team(&pool, command).await?,
        Commands::Category(command) => run_category(&pool, command).await?,
        Commands::Check(command) => run_check(&pool, command).await?,
    }

    Ok(())
}

async fn run_user(pool: &SqlitePool, command: UserCommand) -> anyhow::Result<()> {
    let users = UserDirectory::new(pool.clone());
    match command {
        UserCommand::Add { key, username, display_name, admin, groups } => {
            let mut profile = UserProfile::new(key, username);
            if let Some(display_name) = display_name {
                profile = profile.with_display_name(display_name);
            }
            users.upsert(&profile, admin, &groups).await?;
            println!("Stored user {} ({})", profile.username, profile.key);
        }
    }
    Ok(())
}

async fn run_team(pool: &SqlitePool, command: TeamCommand) -> anyhow::Result<()> {
    let teams = TeamStore::new(pool.clone());
    match command {
        TeamCommand::Add { name } => {
            let team = teams.add(&name).await?;
            println!("Created team {} (id {})", team.name, team.id);
        }
        TeamCommand::Remove { name } => {
            if teams.remove_team(&name).await? {
                println!("Removed team {}", name);
            } else {
                anyhow::bail!("no team named {}", name);
            }
        }
        TeamCommand::List => {
            println!("{:<8} {}", "Id", "Name");
            for team in teams.all().await? {
                println!("{:<8} {}", team.id, team.name);
            }
        }
        TeamCommand::Member { team, user_key, coordinator } => {
            let found = teams
                .team_by_name(&team)
                .await?
                .with_context(|| format!("no team named {}", team))?;
            let role = if coordinator { TeamRole::Coordinator } else { TeamRole::Member };
            teams.add_member(&found, &UserKey::new(user_key.clone()), role).await?;
            println!("Added {} to {} as {}", user_key, found.name, role);
        }
    }
    Ok(())
}

async fn run_category(pool: &SqlitePool, command: CategoryCommand) -> anyhow::Result<()> {
    let categories = CategoryStore::new(pool.clone());
    match command {
        CategoryCommand::Add { name } => {
            let category = categories.add(&name).await?;
            println!("Created category {} (id {})", category.name, category.id);
        }
        CategoryCommand::Remove { name } => {
            categories.remove_category(&name).await?;
            println!("Removed category {}", name);
        }
        CategoryCommand::List => {
            println!("{:<8} {}", "Id", "Name");
            for category in categories.all().await? {
                println!("{:<8} {}", category.id, category.name);
            }
        }
    }
    Ok(())
}

async fn run_check(pool: &SqlitePool, command: CheckCommand) -> anyhow::Result<()> {
    let timesheets = TimesheetStore::new(pool.clone());

    match command {
        CheckCommand::View { target, sheet } => {
            let policy = build_policy(pool, &target);
            let actor = policy.require_username(&target.actor).await?;
            let sheet = timesheets
                .by_id(sheet)
                .await?
                .with_context(|| format!("no timesheet {}", sheet))?;
            let allowed = policy.user_can_view_timesheet(Some(&actor), Some(&sheet)).await?;
            println!("view: {}", if allowed { "allowed" } else { "denied" });
        }
        CheckCommand::Edit { target, entry } => {
            let decision = check_entry(pool, &timesheets, &target, entry, EntryAction::Edit).await?;
            println!("edit: {}", decision);
        }
        CheckCommand::Delete { target, entry } => {
            let decision = check_entry(pool, &timesheets, &target, entry, EntryAction::Delete).await?;
            println!("delete: {}", decision);
        }
    }
    Ok(())
}

async fn check_entry(
    pool: &SqlitePool,
    timesheets: &TimesheetStore,
    target: &CheckTarget,
    entry_id: Uuid,
    action: EntryAction,
) -> anyhow::Result<Decision> {
    let policy = build_policy(pool, target);
    let actor = policy.require_username(&target.actor).await?;
    let entry = timesheets
        .entry_by_id(entry_id)
        .await?
        .with_context(|| format!("no timesheet entry {}", entry_id))?;

    Ok(policy
        .decide_entry_access(action, &actor, &entry.timesheet, &entry.span())
        .await?)
}

fn build_policy(pool: &SqlitePool, target: &CheckTarget) -> PermissionPolicy {
    let policy = PermissionPolicy::new(
        Arc::new(TeamStore::new(pool.clone())),
        Arc::new(UserDirectory::new(pool.clone())),
        ApprovalConfig::from_env(),
    );
    match target.at {
        Some(at) => policy.with_clock(Arc::new(FixedClock(at))),
        None => policy,
    }
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate-local folder.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
