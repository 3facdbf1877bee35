//! The module contains the `Transaction` type and the parser turning command
//! arguments into one.
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// One recorded expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: NaiveDateTime,
    pub category: String,
    pub description: String,
    pub amount: i64,
}

impl Transaction {
    /// Parses `<category> [description ...] <amount>`.
    ///
    /// The first token is the category, the last one the amount, everything in
    /// between is joined with single spaces into the description. The
    /// timestamp is `now` truncated to whole seconds.
    pub fn parse<S: AsRef<str>>(args: &[S], now: NaiveDateTime) -> Result<Self, ParseError> {
        let [first, middle @ .., last] = args else {
            return Err(ParseError::TooFewArguments);
        };

        let category = first.as_ref();
        if category.trim().is_empty() {
            return Err(ParseError::EmptyCategory);
        }

        let raw_amount = last.as_ref();
        let amount = raw_amount
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidAmount(raw_amount.to_string()))?;

        let description = middle
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            category: category.to_string(),
            description,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_milli_opt(12, 30, 45, 250)
            .unwrap()
    }

    #[test]
    fn category_description_and_amount() {
        let tx = Transaction::parse(&["Food", "Soto", "ayam", "25000"], now()).unwrap();
        assert_eq!(tx.category, "Food");
        assert_eq!(tx.description, "Soto ayam");
        assert_eq!(tx.amount, 25_000);
    }

    #[test]
    fn two_tokens_give_empty_description() {
        let tx = Transaction::parse(&["Food", "25000"], now()).unwrap();
        assert_eq!(tx.description, "");
    }

    #[test]
    fn timestamp_is_truncated_to_seconds() {
        let tx = Transaction::parse(&["Food", "1"], now()).unwrap();
        assert_eq!(tx.timestamp.nanosecond(), 0);
        assert_eq!(tx.timestamp.second(), 45);
    }

    #[test]
    fn signed_amounts_are_accepted() {
        assert_eq!(Transaction::parse(&["Refund", "-500"], now()).unwrap().amount, -500);
        assert_eq!(Transaction::parse(&["Gift", "+500"], now()).unwrap().amount, 500);
    }

    #[test]
    fn rejects_too_few_arguments() {
        let empty: [&str; 0] = [];
        assert_eq!(
            Transaction::parse(&empty, now()).unwrap_err(),
            ParseError::TooFewArguments
        );
        assert_eq!(
            Transaction::parse(&["Food"], now()).unwrap_err(),
            ParseError::TooFewArguments
        );
    }

    #[test]
    fn rejects_non_integer_amount() {
        let err = Transaction::parse(&["Food", "Soto", "25.000,50"], now()).unwrap_err();
        assert_eq!(err, ParseError::InvalidAmount("25.000,50".to_string()));

        let err = Transaction::parse(&["Food", "Soto", "banyak"], now()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidAmount(_)));
    }

    #[test]
    fn rejects_blank_category() {
        let err = Transaction::parse(&[" ", "1000"], now()).unwrap_err();
        assert_eq!(err, ParseError::EmptyCategory);
    }
}
