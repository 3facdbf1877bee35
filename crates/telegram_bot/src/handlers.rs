use chrono::Datelike;
use teloxide::{
    RequestError,
    dispatching::{HandlerExt, UpdateHandler},
    prelude::*,
    types::User,
    utils::command::BotCommands,
};

use crate::{ConfigParameters, commands::LedgerCommands, ui};

/// Build the schema for `LedgerCommands` commands
pub(crate) fn schema() -> UpdateHandler<RequestError> {
    Update::filter_message()
        .filter(|msg: Message, cfg: ConfigParameters| is_allowed(&cfg, msg.from.as_ref()))
        .filter_command::<LedgerCommands>()
        .endpoint(handle_command)
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
    cmd: LedgerCommands,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let now = cfg.now();

    let reply = match cmd {
        LedgerCommands::Start => ui::welcome_text(),
        LedgerCommands::Help => LedgerCommands::descriptions().to_string(),
        LedgerCommands::Catat { args } => {
            let tokens = LedgerCommands::tokens(&args);
            match cfg.engine.record_transaction(&tokens, now).await {
                Ok(outcome) => ui::recorded_text(&outcome),
                Err(err) => {
                    tracing::warn!("/catat failed: {err}");
                    ui::record_error_text(&err)
                }
            }
        }
        LedgerCommands::Rekap => match cfg.engine.summarize_month(now.year(), now.month()).await {
            Ok(summary) => ui::summary_text(&summary),
            Err(err) => {
                tracing::warn!("/rekap failed: {err}");
                ui::summary_error_text(&err)
            }
        },
        LedgerCommands::Tahunan => match cfg.engine.yearly_rekap(now.year()).await {
            Ok(rows) => ui::yearly_text(now.year(), &rows),
            Err(err) => {
                tracing::warn!("/tahunan failed: {err}");
                ui::summary_error_text(&err)
            }
        },
    };

    bot.send_message(chat_id, reply).await?;
    Ok(())
}

fn is_allowed(cfg: &ConfigParameters, from: Option<&User>) -> bool {
    let Some(from) = from else {
        return false;
    };
    match &cfg.allowed_users {
        None => true,
        Some(ids) => ids.contains(&from.id),
    }
}
