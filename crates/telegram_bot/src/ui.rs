use engine::{EngineError, RecordOutcome, RekapRow, Summary};

pub(crate) const USAGE: &str = "/catat <kategori> <deskripsi> <nominal>";

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Formats an integer amount as `Rp25,000`.
pub(crate) fn rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}Rp{grouped}")
}

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i as usize))
        .copied()
        .unwrap_or("?")
}

pub(crate) fn welcome_text() -> String {
    format!(
        "Halo! Kirim catatan keuangan dengan format:\n{USAGE}\nGunakan /rekap untuk lihat total bulan ini."
    )
}

pub(crate) fn recorded_text(outcome: &RecordOutcome) -> String {
    let mut text = format!(
        "✅ Tercatat: {} - {} {}",
        outcome.category,
        outcome.description,
        rupiah(outcome.amount)
    );
    if let Some(row) = &outcome.rekap {
        text.push_str(&format!(
            "\n📅 Total {} {}: {}",
            month_name(row.month),
            row.year,
            rupiah(row.total_amount)
        ));
    }
    text
}

pub(crate) fn summary_text(summary: &Summary) -> String {
    match summary {
        Summary::Empty => "📊 Belum ada catatan bulan ini.".to_string(),
        Summary::NonEmpty {
            by_category,
            total_amount,
        } => {
            let mut text = "📊 Rekap Bulan Ini:\n".to_string();
            for entry in by_category {
                text.push_str(&format!("- {}: {}\n", entry.category, rupiah(entry.amount)));
            }
            text.push_str(&format!("\n💰 Total: {}", rupiah(*total_amount)));
            text
        }
    }
}

pub(crate) fn yearly_text(year: i32, rows: &[RekapRow]) -> String {
    if rows.is_empty() {
        return format!("📆 Belum ada rekap untuk tahun {year}.");
    }

    let mut text = format!("📆 Rekap Tahun {year}:\n");
    for row in rows {
        text.push_str(&format!(
            "- {}: {}\n",
            month_name(row.month),
            rupiah(row.total_amount)
        ));
    }
    let total = rows
        .iter()
        .try_fold(0i64, |acc, row| acc.checked_add(row.total_amount));
    match total {
        Some(total) => text.push_str(&format!("\n💰 Total: {}", rupiah(total))),
        None => text.push_str("\n💰 Total: terlalu besar untuk dihitung"),
    }
    text
}

pub(crate) fn record_error_text(err: &EngineError) -> String {
    match err {
        EngineError::InvalidInput(cause) => {
            format!("⚠️ Format salah.\nGunakan: {USAGE}\nError: {cause}")
        }
        EngineError::AggregateUpdateFailed(cause) => format!(
            "⚠️ Catatan tersimpan, tetapi rekap bulanan gagal diperbarui.\nPeriksa sheet Rekap secara manual.\nError: {cause}"
        ),
        other => format!("⚠️ Gagal menyimpan catatan.\nError: {other}"),
    }
}

pub(crate) fn summary_error_text(err: &EngineError) -> String {
    match err {
        EngineError::RekapDisabled => "ℹ️ Rekap tahunan tidak aktif.".to_string(),
        other => format!("⚠️ Gagal ambil rekap: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use engine::{CategoryTotal, ParseError, StoreError};

    use super::*;

    #[test]
    fn rupiah_groups_thousands() {
        assert_eq!(rupiah(0), "Rp0");
        assert_eq!(rupiah(999), "Rp999");
        assert_eq!(rupiah(25_000), "Rp25,000");
        assert_eq!(rupiah(1_234_567), "Rp1,234,567");
        assert_eq!(rupiah(-5_000), "-Rp5,000");
        assert_eq!(rupiah(i64::MIN), "-Rp9,223,372,036,854,775,808");
    }

    #[test]
    fn recorded_message_mentions_everything() {
        let outcome = RecordOutcome {
            category: "Food".to_string(),
            description: "Soto".to_string(),
            amount: 25_000,
            rekap: Some(RekapRow {
                year: 2024,
                month: 3,
                total_amount: 40_000,
            }),
        };
        assert_eq!(
            recorded_text(&outcome),
            "✅ Tercatat: Food - Soto Rp25,000\n📅 Total Maret 2024: Rp40,000"
        );
    }

    #[test]
    fn summary_lists_categories_then_total() {
        let summary = Summary::NonEmpty {
            by_category: vec![
                CategoryTotal {
                    category: "A".to_string(),
                    amount: 15,
                },
                CategoryTotal {
                    category: "B".to_string(),
                    amount: 20,
                },
            ],
            total_amount: 35,
        };
        assert_eq!(
            summary_text(&summary),
            "📊 Rekap Bulan Ini:\n- A: Rp15\n- B: Rp20\n\n💰 Total: Rp35"
        );
        assert_eq!(summary_text(&Summary::Empty), "📊 Belum ada catatan bulan ini.");
    }

    #[test]
    fn input_errors_show_usage() {
        let text = record_error_text(&EngineError::InvalidInput(ParseError::TooFewArguments));
        assert!(text.contains(USAGE));
        assert!(text.contains("kategori dan nominal wajib diisi"));
    }

    #[test]
    fn aggregate_failure_is_told_apart() {
        let text = record_error_text(&EngineError::AggregateUpdateFailed(
            StoreError::WriteFailed("boom".to_string()),
        ));
        assert!(text.contains("Catatan tersimpan"));
        assert!(text.contains("boom"));

        let text = record_error_text(&EngineError::StoreUnavailable(StoreError::WriteFailed(
            "boom".to_string(),
        )));
        assert!(text.starts_with("⚠️ Gagal menyimpan catatan."));
    }

    #[test]
    fn yearly_rekap_uses_month_names() {
        let rows = [
            RekapRow {
                year: 2024,
                month: 1,
                total_amount: 10,
            },
            RekapRow {
                year: 2024,
                month: 12,
                total_amount: 5,
            },
        ];
        assert_eq!(
            yearly_text(2024, &rows),
            "📆 Rekap Tahun 2024:\n- Januari: Rp10\n- Desember: Rp5\n\n💰 Total: Rp15"
        );
    }

    #[test]
    fn yearly_total_beyond_i64_is_not_summed() {
        let rows = [
            RekapRow {
                year: 2024,
                month: 1,
                total_amount: i64::MAX,
            },
            RekapRow {
                year: 2024,
                month: 2,
                total_amount: 1,
            },
        ];
        let text = yearly_text(2024, &rows);
        assert!(text.contains("- Januari: Rp9,223,372,036,854,775,807"));
        assert!(text.ends_with("💰 Total: terlalu besar untuk dihitung"));
    }
}
