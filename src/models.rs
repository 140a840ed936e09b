// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    Expense,
    Income,
    InternalTransfer,
    DepositTopUp,
    DepositWithdrawal,
    DepositInterestAccrual,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::InternalTransfer => "internalTransfer",
            Self::DepositTopUp => "depositTopUp",
            Self::DepositWithdrawal => "depositWithdrawal",
            Self::DepositInterestAccrual => "depositInterestAccrual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(Self::Expense),
            "income" => Some(Self::Income),
            "internalTransfer" => Some(Self::InternalTransfer),
            "depositTopUp" => Some(Self::DepositTopUp),
            "depositWithdrawal" => Some(Self::DepositWithdrawal),
            "depositInterestAccrual" => Some(Self::DepositInterestAccrual),
            _ => None,
        }
    }

    /// Whether the amount credits (true) or debits (false) the account
    /// holding the transaction. Transfers are handled pairwise and return
    /// false here.
    pub fn credits_account(&self) -> bool {
        matches!(
            self,
            Self::Income | Self::DepositTopUp | Self::DepositInterestAccrual
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub currency: String,
    pub balance: Decimal,
    pub balance_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub r#type: TransactionType,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: i64,
    pub name: String,
}

/// Ledger transaction. Constructed by the import engine, owned by the
/// ledger after insertion. `id` is content-derived (see `import::transaction_id`)
/// so re-importing identical rows is idempotent at the ID level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub converted_amount: Option<Decimal>,
    pub r#type: TransactionType,
    pub category: String,
    pub subcategory: Option<String>,
    pub account_id: Option<i64>,
    pub account_name: Option<String>,
    pub target_account_id: Option<i64>,
    pub target_account_name: Option<String>,
    pub target_currency: Option<String>,
    pub target_amount: Option<Decimal>,
    /// Always None for CSV-imported rows; kept for parity with
    /// recurring-series transactions elsewhere in the app.
    pub recurring_series_id: Option<i64>,
    /// Epoch milliseconds: calendar date at midnight plus the source row
    /// index, so intra-day file order survives any created_at sort.
    pub created_at: i64,
}

/// Parsed tabular file handed over by the CSV tokenizer. Read-only.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateFormat {
    /// yyyy-MM-dd
    Iso,
    /// dd.MM.yyyy
    DayMonthYear,
    /// Try a fixed ordered list of formats, first hit wins.
    #[default]
    Auto,
}

/// Maps logical fields to header names, plus parsing knobs. A `None`
/// header means the field is not present in this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date: Option<String>,
    pub r#type: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub account: Option<String>,
    pub target_account: Option<String>,
    pub target_currency: Option<String>,
    pub target_amount: Option<String>,
    pub category: Option<String>,
    pub subcategories: Option<String>,
    pub note: Option<String>,
    pub date_format: DateFormat,
    pub subcategory_separator: String,
    /// Lowercased raw type string -> transaction type.
    pub type_aliases: HashMap<String, TransactionType>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: None,
            r#type: None,
            amount: None,
            currency: None,
            account: None,
            target_account: None,
            target_currency: None,
            target_amount: None,
            category: None,
            subcategories: None,
            note: None,
            date_format: DateFormat::Auto,
            subcategory_separator: ",".to_string(),
            type_aliases: default_type_aliases(),
        }
    }
}

impl ColumnMapping {
    /// Identity mapping: every logical field points at a header of the
    /// same name. Used by the CLI when no mapping file is given.
    pub fn standard() -> Self {
        Self {
            date: Some("date".into()),
            r#type: Some("type".into()),
            amount: Some("amount".into()),
            currency: Some("currency".into()),
            account: Some("account".into()),
            target_account: Some("targetAccount".into()),
            target_currency: Some("targetCurrency".into()),
            target_amount: Some("targetAmount".into()),
            category: Some("category".into()),
            subcategories: Some("subcategories".into()),
            note: Some("note".into()),
            ..Self::default()
        }
    }
}

pub fn default_type_aliases() -> HashMap<String, TransactionType> {
    use TransactionType::*;
    [
        ("expense", Expense),
        ("расход", Expense),
        ("income", Income),
        ("доход", Income),
        ("transfer", InternalTransfer),
        ("internal transfer", InternalTransfer),
        ("перевод", InternalTransfer),
        ("deposit top up", DepositTopUp),
        ("deposit withdrawal", DepositWithdrawal),
        ("deposit interest", DepositInterestAccrual),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// User-confirmed overrides from raw CSV values to existing entities.
/// Consulted before automatic resolution, never mutated by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityMapping {
    /// Raw CSV account string -> existing account id.
    pub accounts: HashMap<String, i64>,
    /// Raw CSV category string -> existing category name.
    pub categories: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicates_skipped: usize,
    pub created_accounts: usize,
    pub created_categories: usize,
    pub created_subcategories: usize,
    pub errors: Vec<String>,
}
