// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Bounds peak memory over large files: parsed transactions and their
//! subcategory links buffer here and flush to the ledger every
//! `BATCH_SIZE` rows (and once more at end-of-file). Batching must not
//! change results, only memory and timing.

use anyhow::Result;

use crate::ledger::TransactionLedger;
use crate::models::Transaction;

pub const BATCH_SIZE: usize = 500;

#[derive(Default)]
pub struct BatchAccumulator {
    transactions: Vec<Transaction>,
    links: Vec<(String, i64)>,
}

impl BatchAccumulator {
    pub fn push(&mut self, transaction: Transaction, subcategory_ids: &[i64]) {
        for sub_id in subcategory_ids {
            self.links.push((transaction.id.clone(), *sub_id));
        }
        self.transactions.push(transaction);
    }

    pub fn is_full(&self) -> bool {
        self.transactions.len() >= BATCH_SIZE
    }

    /// Appends the buffered transactions to the ledger in deferred mode,
    /// merges buffered links into the running total, and clears both
    /// buffers.
    pub fn flush(
        &mut self,
        ledger: &TransactionLedger,
        all_links: &mut Vec<(String, i64)>,
    ) -> Result<()> {
        if self.transactions.is_empty() {
            return Ok(());
        }
        ledger.add_for_import(&self.transactions)?;
        all_links.append(&mut self.links);
        self.transactions.clear();
        Ok(())
    }
}
