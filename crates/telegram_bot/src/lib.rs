//! Telegram bot.
//!
//! The bot exposes the ledger commands (`/catat`, `/rekap`, `/tahunan`) and
//! renders the engine outcomes as chat messages. Every command is handled on
//! its own; a failing command only produces an error reply.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use engine::LedgerEngine;
use teloxide::{prelude::*, utils::command::BotCommands};
use thiserror::Error;

pub use commands::LedgerCommands;
pub use teloxide::types::UserId;

mod commands;
mod handlers;
mod ui;

const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("telegram token is missing")]
    MissingToken,
    #[error("ledger engine is missing")]
    MissingEngine,
}

#[derive(Clone)]
pub struct ConfigParameters {
    allowed_users: Option<Vec<UserId>>,
    engine: LedgerEngine,
    timezone: Tz,
}

impl ConfigParameters {
    /// Current wall-clock time in the configured timezone.
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }
}

pub struct Bot {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    engine: LedgerEngine,
    timezone: Tz,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        if let Err(err) = bot.set_my_commands(LedgerCommands::bot_commands()).await {
            tracing::warn!("failed to register bot commands: {err}");
        }

        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            engine: self.engine.clone(),
            timezone: self.timezone,
        };

        Dispatcher::builder(bot, handlers::schema())
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    engine: Option<LedgerEngine>,
    timezone: Option<Tz>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn allowed_users(mut self, allowed_users: Vec<UserId>) -> BotBuilder {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users);
        }
        self
    }

    pub fn engine(mut self, engine: LedgerEngine) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    /// Timezone used to date records and pick the current month.
    pub fn timezone(mut self, timezone: Tz) -> BotBuilder {
        self.timezone = Some(timezone);
        self
    }

    pub fn build(self) -> Result<Bot, BuildError> {
        tracing::info!("Initializing telegram bot...");
        if self.token.trim().is_empty() {
            return Err(BuildError::MissingToken);
        }
        let engine = self.engine.ok_or(BuildError::MissingEngine)?;

        Ok(Bot {
            token: self.token,
            allowed_users: self.allowed_users,
            engine,
            timezone: self.timezone.unwrap_or(DEFAULT_TIMEZONE),
        })
    }
}
