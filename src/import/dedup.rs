// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Fingerprint-based duplicate detection against pre-existing ledger data.
//! The index is a read-only snapshot built once per import; rows imported
//! by the same call are deliberately not added to it, so a file containing
//! genuine duplicates within itself imports all of them.

use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::ledger::TransactionLedger;
use crate::models::{Transaction, TransactionType};
use crate::utils::normalize_text;

/// Order-insensitive duplicate key. Equal fingerprints mean duplicate
/// regardless of other field differences; this equality is deliberately
/// lossy (note text and description casing do not participate).
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    date: String,
    amount: String,
    description: String,
    account: String,
    r#type: TransactionType,
}

impl Fingerprint {
    pub fn new(
        date: &str,
        amount: &Decimal,
        description: &str,
        account_id: Option<i64>,
        r#type: TransactionType,
    ) -> Self {
        Self {
            date: date.to_string(),
            // normalize() strips trailing zeros so 1500 and 1500.00 collide
            amount: amount.normalize().to_string(),
            description: normalize_text(description),
            account: account_id.map(|id| id.to_string()).unwrap_or_default(),
            r#type,
        }
    }

    pub fn of_transaction(t: &Transaction) -> Self {
        Self::new(
            &t.date.to_string(),
            &t.amount,
            &t.description,
            t.account_id,
            t.r#type,
        )
    }
}

pub struct FingerprintIndex {
    set: HashSet<Fingerprint>,
}

impl FingerprintIndex {
    /// One O(existingCount) pass over the ledger, done before any row.
    pub fn build(ledger: &TransactionLedger) -> Result<Self> {
        let mut set = HashSet::new();
        for s in ledger.transaction_summaries()? {
            set.insert(Fingerprint::new(
                &s.date,
                &s.amount,
                &s.description,
                s.account_id,
                s.r#type,
            ));
        }
        Ok(Self { set })
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.set.contains(fp)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
