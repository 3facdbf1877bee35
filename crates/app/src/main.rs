use std::sync::Arc;

use clap::Parser;
use engine::{
    LedgerEngine,
    workbook::{MemoryWorkbook, SheetsWorkbook, SqliteWorkbook, Workbook},
};
use migration::{Migrator, MigratorTrait};
use settings::{Settings, Storage};
use telegram_bot::UserId;

mod settings;

const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

#[derive(Debug, Parser)]
#[command(name = "pencatat", about = "Telegram bot recording expenses in a monthly ledger")]
struct Args {
    /// Settings file path (TOML).
    #[arg(long, env = "PENCATAT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let settings = Settings::new(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pencatat={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let workbook = open_workbook(&settings).await?;
    tracing::info!(
        "Using workbook \"{}\" (rekap {})",
        workbook.name(),
        if settings.ledger.rekap { "on" } else { "off" }
    );
    let engine = LedgerEngine::for_workbook(workbook, settings.ledger.rekap);

    let allowed_users = settings
        .telegram
        .allowed_users
        .iter()
        .map(|id| UserId(*id))
        .collect();

    let bot = telegram_bot::Bot::builder()
        .token(&settings.telegram.token)
        .allowed_users(allowed_users)
        .engine(engine)
        .timezone(settings.timezone()?)
        .build()?;
    bot.run().await;

    Ok(())
}

async fn open_workbook(
    settings: &Settings,
) -> Result<Arc<dyn Workbook>, Box<dyn std::error::Error + Send + Sync>> {
    let name = settings.ledger.workbook.as_str();

    let workbook: Arc<dyn Workbook> = match &settings.storage {
        Storage::Memory => {
            tracing::warn!("Using in-memory storage, records are lost on exit");
            Arc::new(MemoryWorkbook::new(name))
        }
        Storage::Sqlite(path) => {
            let database = sea_orm::Database::connect(format!("sqlite:{path}?mode=rwc")).await?;
            Migrator::up(&database, None).await?;
            Arc::new(SqliteWorkbook::open(database, name).await?)
        }
        Storage::GoogleSheets => {
            let token = settings
                .google
                .as_ref()
                .map(|g| g.access_token.as_str())
                .unwrap_or_default();
            Arc::new(SheetsWorkbook::open(token, name).await?)
        }
    };

    Ok(workbook)
}
