// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::{Transaction, TransactionType};
use crate::utils::{fx_convert, get_base_currency};

/// Minimal projection of a stored transaction, enough to fingerprint it.
pub struct TransactionSummary {
    pub date: String,
    pub amount: Decimal,
    pub description: String,
    pub account_id: Option<i64>,
    pub r#type: TransactionType,
}

/// The transaction ledger. Batch mode maps to an explicit sqlite
/// transaction: inserts between `begin_batch` and `save_synchronously`
/// carry no per-insert side effects (no balance recompute, no fsync),
/// and the single COMMIT is the one durable save of an import.
pub struct TransactionLedger<'a> {
    conn: &'a Connection,
    batch_mode: bool,
}

impl<'a> TransactionLedger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            batch_mode: false,
        }
    }

    pub fn base_currency(&self) -> Result<String> {
        get_base_currency(self.conn)
    }

    /// One-time snapshot used to build the duplicate-detection index.
    pub fn transaction_summaries(&self) -> Result<Vec<TransactionSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, amount, description, account_id, type FROM transactions")?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<i64>>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (date, amount, description, account_id, typ) = row?;
            out.push(TransactionSummary {
                date,
                amount: amount
                    .parse::<Decimal>()
                    .with_context(|| format!("Invalid stored amount '{}'", amount))?,
                description,
                account_id,
                r#type: TransactionType::parse(&typ)
                    .ok_or_else(|| anyhow!("Unknown stored transaction type '{}'", typ))?,
            });
        }
        Ok(out)
    }

    pub fn begin_batch(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        self.batch_mode = true;
        Ok(())
    }

    pub fn in_batch(&self) -> bool {
        self.batch_mode
    }

    /// Appends transactions with none of the usual per-insert side effects.
    /// Only valid inside batch mode.
    pub fn add_for_import(&self, txs: &[Transaction]) -> Result<()> {
        if !self.batch_mode {
            return Err(anyhow!("add_for_import called outside batch mode"));
        }
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO transactions(\
                 id, date, description, amount, currency, converted_amount, type, \
                 category, subcategory, account_id, account_name, \
                 target_account_id, target_account_name, target_currency, target_amount, \
                 recurring_series_id, created_at) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
        )?;
        for t in txs {
            stmt.execute(params![
                t.id,
                t.date.to_string(),
                t.description,
                t.amount.to_string(),
                t.currency,
                t.converted_amount.map(|d| d.to_string()),
                t.r#type.as_str(),
                t.category,
                t.subcategory,
                t.account_id,
                t.account_name,
                t.target_account_id,
                t.target_account_name,
                t.target_currency,
                t.target_amount.map(|d| d.to_string()),
                t.recurring_series_id,
                t.created_at,
            ])?;
        }
        Ok(())
    }

    /// Leaves batch mode without performing the ledger's own save.
    pub fn end_batch_without_save(&mut self) {
        self.batch_mode = false;
    }

    /// Abandons an in-progress batch so the connection stays usable for a
    /// retry of the whole file. No-op when the batch already committed.
    pub fn rollback_batch(&mut self) -> Result<()> {
        self.batch_mode = false;
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// The one synchronous durable save of an import: commits everything
    /// written since `begin_batch`. Chosen over an async save so imported
    /// data survives an immediate termination.
    pub fn save_synchronously(&self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Synchronous save failed")?;
        Ok(())
    }

    /// Rebuilds the secondary indexes used by filtering/search.
    pub fn rebuild_indexes(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            DROP INDEX IF EXISTS idx_transactions_date;
            DROP INDEX IF EXISTS idx_transactions_account;
            DROP INDEX IF EXISTS idx_transactions_created_at;
            DROP INDEX IF EXISTS idx_transactions_category;
            CREATE INDEX idx_transactions_date ON transactions(date);
            CREATE INDEX idx_transactions_account ON transactions(account_id);
            CREATE INDEX idx_transactions_created_at ON transactions(created_at);
            CREATE INDEX idx_transactions_category ON transactions(category, type);
            "#,
        )?;
        Ok(())
    }

    /// Refreshes the latest-rate cache for every currency seen in the
    /// ledger, toward the base currency. Missing rates cache as 1:1; that
    /// only degrades summary conversion, never correctness of the ledger.
    pub fn precompute_conversions(&self) -> Result<()> {
        let base = get_base_currency(self.conn)?;
        let today = Utc::now().date_naive();
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT currency FROM transactions")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut currencies = Vec::new();
        for row in rows {
            currencies.push(row?);
        }
        let mut upsert = self.conn.prepare(
            "INSERT INTO fx_cache(currency, base, rate) VALUES (?1, ?2, ?3)
             ON CONFLICT(currency) DO UPDATE SET base=excluded.base, rate=excluded.rate",
        )?;
        for ccy in currencies {
            let rate = fx_convert(self.conn, today, Decimal::ONE, &ccy, &base)?;
            upsert.execute(params![ccy, base, rate.to_string()])?;
        }
        Ok(())
    }

    /// Recomputes every affected account's balance from its full
    /// transaction history and persists the results as one batch.
    /// Transfers debit the source and credit the target (targetAmount
    /// when present, for cross-currency transfers).
    pub fn recompute_balances(&self) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, target_account_id, amount, target_amount, type FROM transactions",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, Option<i64>>(0)?,
                r.get::<_, Option<i64>>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?;

        let mut balances: HashMap<i64, Decimal> = HashMap::new();
        for row in rows {
            let (account_id, target_account_id, amount, target_amount, typ) = row?;
            let amount = amount
                .parse::<Decimal>()
                .with_context(|| format!("Invalid stored amount '{}'", amount))?;
            let r#type = TransactionType::parse(&typ)
                .ok_or_else(|| anyhow!("Unknown stored transaction type '{}'", typ))?;
            match r#type {
                TransactionType::InternalTransfer => {
                    if let Some(src) = account_id {
                        *balances.entry(src).or_insert(Decimal::ZERO) -= amount;
                    }
                    if let Some(dst) = target_account_id {
                        let credited = match target_amount {
                            Some(s) => s
                                .parse::<Decimal>()
                                .with_context(|| format!("Invalid target amount '{}'", s))?,
                            None => amount,
                        };
                        *balances.entry(dst).or_insert(Decimal::ZERO) += credited;
                    }
                }
                t => {
                    if let Some(acct) = account_id {
                        let entry = balances.entry(acct).or_insert(Decimal::ZERO);
                        if t.credits_account() {
                            *entry += amount;
                        } else {
                            *entry -= amount;
                        }
                    }
                }
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut update = tx.prepare("UPDATE accounts SET balance=?1 WHERE id=?2")?;
            for (id, balance) in &balances {
                update.execute(params![balance.to_string(), id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Re-registers all accounts with the balance coordination layer in
    /// recompute-from-transactions mode, so incremental updates after the
    /// import stay consistent with the refolded balances.
    pub fn register_recomputed_accounts(&self) -> Result<()> {
        self.conn
            .execute("UPDATE accounts SET balance_mode='recompute'", [])?;
        Ok(())
    }

    /// Rebuilds the category-totals aggregate cache. Must run before
    /// observers are notified; they read this cache.
    pub fn rebuild_category_totals(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT category, type, currency, amount FROM transactions")?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?;
        let mut totals: HashMap<(String, String, String), (Decimal, i64)> = HashMap::new();
        for row in rows {
            let (category, typ, currency, amount) = row?;
            let amount = amount
                .parse::<Decimal>()
                .with_context(|| format!("Invalid stored amount '{}'", amount))?;
            let entry = totals
                .entry((category, typ, currency))
                .or_insert((Decimal::ZERO, 0));
            entry.0 += amount;
            entry.1 += 1;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM category_totals", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO category_totals(category, type, currency, total, tx_count) \
                 VALUES (?1,?2,?3,?4,?5)",
            )?;
            for ((category, typ, currency), (total, count)) in &totals {
                insert.execute(params![category, typ, currency, total.to_string(), count])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Signals dependent observers that ledger/category/account state
    /// changed, by bumping a monotonic data version they watch.
    pub fn notify_observers(&self) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings(key, value) VALUES('data_version', '1')
             ON CONFLICT(key) DO UPDATE SET value=CAST(CAST(value AS INTEGER)+1 AS TEXT)",
            [],
        )?;
        Ok(())
    }

    pub fn data_version(&self) -> Result<i64> {
        use rusqlite::OptionalExtension;
        let v: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key='data_version'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        Ok(v.and_then(|s| s.parse().ok()).unwrap_or(0))
    }
}
