//! Command structs

use teloxide::utils::command::{BotCommands, ParseError};

/// Keeps the raw arguments of `/catat`, the engine validates them.
pub fn raw_args(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Commands to record and review expenses
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "lowercase",
    description = "Perintah pencatatan keuangan:"
)]
pub enum LedgerCommands {
    #[command(description = "Cara memakai bot.")]
    Start,
    #[command(description = "Tampilkan pesan ini.")]
    Help,
    #[command(
        description = "Catat pengeluaran: /catat <kategori> <deskripsi> <nominal>",
        parse_with = raw_args
    )]
    Catat { args: String },
    #[command(description = "Rekap per kategori bulan ini.")]
    Rekap,
    #[command(description = "Total per bulan tahun ini.")]
    Tahunan,
}

impl LedgerCommands {
    /// Whitespace-separated arguments of `/catat`.
    pub fn tokens(args: &str) -> Vec<&str> {
        args.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catat_keeps_every_argument() {
        let cmd = LedgerCommands::parse("/catat Food Soto ayam 25000", "pencatat_bot").unwrap();
        let LedgerCommands::Catat { args } = cmd else {
            panic!("expected /catat");
        };
        assert_eq!(
            LedgerCommands::tokens(&args),
            vec!["Food", "Soto", "ayam", "25000"]
        );
    }

    #[test]
    fn catat_without_arguments_still_parses() {
        let cmd = LedgerCommands::parse("/catat", "pencatat_bot").unwrap();
        assert_eq!(
            cmd,
            LedgerCommands::Catat {
                args: String::new()
            }
        );
    }

    #[test]
    fn rekap_and_tahunan() {
        assert_eq!(
            LedgerCommands::parse("/rekap", "pencatat_bot").unwrap(),
            LedgerCommands::Rekap
        );
        assert_eq!(
            LedgerCommands::parse("/tahunan@pencatat_bot", "pencatat_bot").unwrap(),
            LedgerCommands::Tahunan
        );
    }
}
