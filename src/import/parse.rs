// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure field parsers for the row pipeline. A failure here is row-local:
//! the orchestrator records the error and moves on to the next row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{DateFormat, TransactionType};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unrecognized date '{0}'")]
    Date(String),
    #[error("invalid amount '{0}'")]
    Amount(String),
    #[error("unknown transaction type '{0}'")]
    Type(String),
}

/// Formats tried, in order, when the mapping selects `auto`.
const AUTO_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
];

/// Calendar-local date parse, no timezone involved.
pub fn parse_row_date(raw: &str, format: DateFormat) -> Result<NaiveDate, ParseError> {
    let s = raw.trim();
    let formats: &[&str] = match format {
        DateFormat::Iso => &["%Y-%m-%d"],
        DateFormat::DayMonthYear => &["%d.%m.%Y"],
        DateFormat::Auto => AUTO_FORMATS,
    };
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .ok_or_else(|| ParseError::Date(raw.to_string()))
}

/// Locale-tolerant numeric cleanup: commas become decimal points, spaces
/// (including non-breaking thousands separators) are stripped.
pub fn parse_row_amount(raw: &str) -> Result<Decimal, ParseError> {
    let cleaned: String = raw
        .replace(',', ".")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    cleaned
        .parse::<Decimal>()
        .map_err(|_| ParseError::Amount(raw.to_string()))
}

/// Alias lookup with a substring-containment fallback in either direction.
/// The fallback tolerates punctuation/pluralization drift in user exports;
/// it is heuristic and can mis-classify on very short alias keys.
pub fn parse_row_type(
    raw: &str,
    aliases: &HashMap<String, TransactionType>,
) -> Result<TransactionType, ParseError> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ParseError::Type(raw.to_string()));
    }
    if let Some(t) = aliases.get(&needle) {
        return Ok(*t);
    }
    aliases
        .iter()
        .find(|(key, _)| needle.contains(key.as_str()) || key.contains(&needle))
        .map(|(_, t)| *t)
        .ok_or_else(|| ParseError::Type(raw.to_string()))
}

/// Lenient variant for optional numeric columns (targetAmount): an
/// unparseable value degrades to None instead of skipping the row.
pub fn parse_optional_amount(raw: &str) -> Option<Decimal> {
    if raw.trim().is_empty() {
        return None;
    }
    parse_row_amount(raw).ok()
}
