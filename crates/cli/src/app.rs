//! Wiring: configuration, database and the API handle

use anyhow::{Context, Result};
use rcard_business::{PlatformConfig, RcardApi, ServiceContext, Session};
use rcard_core::{PolicyCatalog, SystemClock};
use rcard_persistence::{Database, EventReader, UserRepo};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{AuthArgs, Cli};

fn database_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

fn ensure_dirs(db_path: &Path, events_dir: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::create_dir_all(events_dir)
        .with_context(|| format!("Failed to create {}", events_dir.display()))?;
    Ok(())
}

/// Configuration from file, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<PlatformConfig> {
    match path {
        Some(path) => PlatformConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PlatformConfig::default()),
    }
}

/// Open the database and build the API
pub async fn open(cli: &Cli) -> Result<RcardApi> {
    let config = load_config(cli.config.as_deref())?;
    ensure_dirs(&cli.db, &cli.events_dir)?;
    debug!(db = %cli.db.display(), events = %cli.events_dir.display(), "Opening database");

    let db = Database::open(&database_url(&cli.db), &cli.events_dir)
        .await
        .context("Failed to open database")?;
    let ctx = ServiceContext::new(db, config, Arc::new(SystemClock));
    Ok(RcardApi::new(ctx))
}

/// Log in with command-line credentials
pub async fn login(api: &RcardApi, auth: &AuthArgs) -> Result<Session> {
    Ok(api.login(&auth.user, &auth.password).await?)
}

pub async fn init(db_path: &Path, events_dir: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("Removed existing database");
    }
    ensure_dirs(db_path, events_dir)?;

    let db = Database::open(&database_url(db_path), events_dir)
        .await
        .context("Failed to initialize database")?;
    info!(db = %db_path.display(), "Database initialized");
    db.pool().close().await;
    Ok(())
}

pub async fn show_status(db_path: &Path, events_dir: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("Database not found at {}", db_path.display());
        println!("   Run 'rcard init' to create the database");
        return Ok(());
    }

    let db = Database::open(&database_url(db_path), events_dir).await?;
    let users = UserRepo::count(db.pool()).await?;
    let events = EventReader::new(events_dir).read_all()?.len();

    println!("Database Status");
    println!("   Path:   {}", db_path.display());
    println!("   Users:  {}", users);
    println!("   Events: {}", events);

    db.pool().close().await;
    Ok(())
}

pub fn show_catalog(catalog: &PolicyCatalog) {
    println!(
        "{:<18} {:<9} {:>10} {:>8} {:>8} {:>10} {:>8}",
        "ID", "TYPE", "ANNUAL FEE", "RATE/MO", "TX FEE", "YEARLY CAP", "MIN DAYS"
    );
    for policy in catalog.programs().chain(std::iter::once(&catalog.default)) {
        println!(
            "{:<18} {:<9} {:>10} {:>7}% {:>8} {:>10} {:>8}",
            policy.id,
            policy.card_type.as_str(),
            policy.annual_fee,
            policy.interest_rate_monthly,
            policy.transaction_fee,
            policy.max_yearly_loans,
            policy.min_interest_days
        );
    }
}
