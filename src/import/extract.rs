// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Resolves the column mapping against the header row once, then hands out
//! trimmed cell values per logical field. An absent column or a short row
//! yields an empty string, never an error.

use crate::models::ColumnMapping;

#[derive(Debug, Default)]
pub struct FieldColumns {
    pub date: Option<usize>,
    pub r#type: Option<usize>,
    pub amount: Option<usize>,
    pub currency: Option<usize>,
    pub account: Option<usize>,
    pub target_account: Option<usize>,
    pub target_currency: Option<usize>,
    pub target_amount: Option<usize>,
    pub category: Option<usize>,
    pub subcategories: Option<usize>,
    pub note: Option<usize>,
}

fn index_of(headers: &[String], header: Option<&String>) -> Option<usize> {
    let wanted = header?.trim();
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
}

impl FieldColumns {
    /// O(fields) header scans, done once per import.
    pub fn resolve(headers: &[String], mapping: &ColumnMapping) -> Self {
        Self {
            date: index_of(headers, mapping.date.as_ref()),
            r#type: index_of(headers, mapping.r#type.as_ref()),
            amount: index_of(headers, mapping.amount.as_ref()),
            currency: index_of(headers, mapping.currency.as_ref()),
            account: index_of(headers, mapping.account.as_ref()),
            target_account: index_of(headers, mapping.target_account.as_ref()),
            target_currency: index_of(headers, mapping.target_currency.as_ref()),
            target_amount: index_of(headers, mapping.target_amount.as_ref()),
            category: index_of(headers, mapping.category.as_ref()),
            subcategories: index_of(headers, mapping.subcategories.as_ref()),
            note: index_of(headers, mapping.note.as_ref()),
        }
    }

    /// Names of required fields the mapping failed to resolve. A non-empty
    /// result fails the whole import before any row is touched.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("date");
        }
        if self.r#type.is_none() {
            missing.push("type");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        missing
    }

    pub fn cell(row: &[String], idx: Option<usize>) -> String {
        idx.and_then(|i| row.get(i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}
