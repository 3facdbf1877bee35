//! Expense ledger engine.
//!
//! Commands are parsed into a [`Transaction`], appended to the partition of
//! the current month through a [`LedgerStore`] and, when a [`RekapStore`] is
//! configured, added to the running total of that month.
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use error::{EngineError, ParseError, StoreError};
pub use ledger::{
    DATE_FORMAT, LEDGER_HEADER, LedgerStore, Partition, PartitionKey, SheetLedgerStore,
};
pub use rekap::{REKAP_HEADER, REKAP_TITLE, RekapRow, RekapStore, SheetRekapStore};
pub use transactions::Transaction;
pub use workbook::Workbook;

mod error;
mod ledger;
mod rekap;
mod transactions;
pub mod workbook;

type ResultEngine<T> = Result<T, EngineError>;

/// What was recorded, for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub category: String,
    pub description: String,
    pub amount: i64,
    /// Updated total of the month, when the rekap is enabled.
    pub rekap: Option<RekapRow>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: i64,
}

/// Breakdown of one month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Summary {
    Empty,
    NonEmpty {
        /// Categories in first-seen order.
        by_category: Vec<CategoryTotal>,
        total_amount: i64,
    },
}

impl Summary {
    /// Groups `transactions` of partition `key`; fails if a total leaves the `i64` range.
    fn from_transactions(
        key: PartitionKey,
        transactions: &[Transaction],
    ) -> Result<Self, StoreError> {
        if transactions.is_empty() {
            return Ok(Summary::Empty);
        }

        let overflow = || StoreError::ReadFailed(format!("{key} total overflows"));
        let mut by_category: Vec<CategoryTotal> = Vec::new();
        let mut total_amount: i64 = 0;
        for tx in transactions {
            total_amount = total_amount.checked_add(tx.amount).ok_or_else(overflow)?;
            match by_category.iter_mut().find(|c| c.category == tx.category) {
                Some(entry) => {
                    entry.amount = entry.amount.checked_add(tx.amount).ok_or_else(overflow)?;
                }
                None => by_category.push(CategoryTotal {
                    category: tx.category.clone(),
                    amount: tx.amount,
                }),
            }
        }

        Ok(Summary::NonEmpty {
            by_category,
            total_amount,
        })
    }
}

/// Orchestrates the ledger and the optional rekap.
///
/// The engine holds no state of its own: every call works on what the
/// stores contain. Calls are not serialized against each other, so two
/// concurrent records for the same month may race on the rekap total.
#[derive(Clone)]
pub struct LedgerEngine {
    ledger: Arc<dyn LedgerStore>,
    rekap: Option<Arc<dyn RekapStore>>,
}

impl LedgerEngine {
    /// Return a builder for `LedgerEngine`. Help to build the struct.
    pub fn builder() -> LedgerEngineBuilder {
        LedgerEngineBuilder::default()
    }

    /// Engine keeping both the ledger and, if `with_rekap`, the rekap in `workbook`.
    pub fn for_workbook(workbook: Arc<dyn Workbook>, with_rekap: bool) -> Self {
        Self {
            ledger: Arc::new(SheetLedgerStore::new(Arc::clone(&workbook))),
            rekap: with_rekap
                .then(|| Arc::new(SheetRekapStore::new(workbook)) as Arc<dyn RekapStore>),
        }
    }

    /// Records `<category> [description ...] <amount>` in the partition of `now`.
    ///
    /// A failed append leaves the rekap untouched. A failed rekap update after
    /// a successful append is reported as [`EngineError::AggregateUpdateFailed`];
    /// the ledger row stays in place.
    pub async fn record_transaction<S: AsRef<str>>(
        &self,
        args: &[S],
        now: NaiveDateTime,
    ) -> ResultEngine<RecordOutcome> {
        let tx = Transaction::parse(args, now)?;
        let key = PartitionKey::of(now);

        let partition = self
            .ledger
            .resolve_partition(key.year, key.month)
            .await
            .map_err(EngineError::StoreUnavailable)?;
        self.ledger
            .append(&partition, &tx)
            .await
            .map_err(EngineError::StoreUnavailable)?;

        let rekap = match &self.rekap {
            Some(rekap) => Some(
                rekap
                    .increment_or_insert(key.year, key.month, tx.amount)
                    .await
                    .map_err(|err| {
                        tracing::error!(
                            "row recorded in {key} but rekap not updated, reconcile manually: {err}"
                        );
                        EngineError::AggregateUpdateFailed(err)
                    })?,
            ),
            None => None,
        };

        tracing::debug!("recorded {} {} in {key}", tx.category, tx.amount);
        Ok(RecordOutcome {
            category: tx.category,
            description: tx.description,
            amount: tx.amount,
            rekap,
        })
    }

    /// Per-category breakdown of `year`/`month`.
    pub async fn summarize_month(&self, year: i32, month: u32) -> ResultEngine<Summary> {
        if !(1..=12).contains(&month) {
            return Err(ParseError::InvalidMonth(month).into());
        }

        let partition = self
            .ledger
            .resolve_partition(year, month)
            .await
            .map_err(EngineError::StoreUnavailable)?;
        let transactions = self
            .ledger
            .transactions(&partition)
            .await
            .map_err(EngineError::StoreUnavailable)?;

        Summary::from_transactions(partition.key, &transactions)
            .map_err(EngineError::StoreUnavailable)
    }

    /// Rekap rows of `year`, in table order.
    pub async fn yearly_rekap(&self, year: i32) -> ResultEngine<Vec<RekapRow>> {
        let rekap = self.rekap.as_ref().ok_or(EngineError::RekapDisabled)?;
        rekap
            .year_rows(year)
            .await
            .map_err(EngineError::StoreUnavailable)
    }
}

/// The builder for `LedgerEngine`
#[derive(Default)]
pub struct LedgerEngineBuilder {
    ledger: Option<Arc<dyn LedgerStore>>,
    rekap: Option<Arc<dyn RekapStore>>,
}

impl LedgerEngineBuilder {
    /// Pass the required ledger store
    pub fn ledger(mut self, ledger: Arc<dyn LedgerStore>) -> LedgerEngineBuilder {
        self.ledger = Some(ledger);
        self
    }

    /// Enable rekap tracking
    pub fn rekap(mut self, rekap: Arc<dyn RekapStore>) -> LedgerEngineBuilder {
        self.rekap = Some(rekap);
        self
    }

    /// Construct `LedgerEngine`
    pub fn build(self) -> ResultEngine<LedgerEngine> {
        Ok(LedgerEngine {
            ledger: self.ledger.ok_or(EngineError::MissingLedger)?,
            rekap: self.rekap,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const MARCH: PartitionKey = PartitionKey {
        year: 2024,
        month: 3,
    };

    fn tx(category: &str, amount: i64) -> Transaction {
        Transaction {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            category: category.to_string(),
            description: String::new(),
            amount,
        }
    }

    #[test]
    fn summary_keeps_first_seen_order() {
        let summary =
            Summary::from_transactions(MARCH, &[tx("A", 10), tx("B", 20), tx("A", 5)]).unwrap();
        assert_eq!(
            summary,
            Summary::NonEmpty {
                by_category: vec![
                    CategoryTotal {
                        category: "A".to_string(),
                        amount: 15
                    },
                    CategoryTotal {
                        category: "B".to_string(),
                        amount: 20
                    },
                ],
                total_amount: 35,
            }
        );
    }

    #[test]
    fn summary_of_nothing_is_empty() {
        assert_eq!(Summary::from_transactions(MARCH, &[]), Ok(Summary::Empty));
    }

    #[test]
    fn summary_refuses_totals_beyond_i64() {
        assert_eq!(
            Summary::from_transactions(MARCH, &[tx("A", i64::MAX), tx("B", 1)]),
            Err(StoreError::ReadFailed("2024-03 total overflows".to_string()))
        );
        assert_eq!(
            Summary::from_transactions(MARCH, &[tx("A", i64::MIN), tx("A", -1)]),
            Err(StoreError::ReadFailed("2024-03 total overflows".to_string()))
        );
    }

    #[test]
    fn builder_requires_a_ledger() {
        assert!(matches!(
            LedgerEngine::builder().build(),
            Err(EngineError::MissingLedger)
        ));
    }
}
