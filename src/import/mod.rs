// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The CSV import engine: streams parsed rows through extraction, field
//! parsing, role resolution, entity resolution, duplicate detection, and
//! batched accumulation, then settles durable state in a fixed order.

pub mod batch;
pub mod dedup;
pub mod extract;
pub mod parse;
pub mod resolve;
pub mod roles;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::directory::{AccountDirectory, CategoryDirectory};
use crate::ledger::TransactionLedger;
use crate::models::{
    ColumnMapping, EntityMapping, ImportResult, ParsedFile, Transaction, TransactionType,
};

use self::batch::BatchAccumulator;
use self::dedup::{Fingerprint, FingerprintIndex};
use self::extract::FieldColumns;
use self::parse::{parse_optional_amount, parse_row_amount, parse_row_date, parse_row_type};
use self::resolve::ResolutionContext;
use self::roles::resolve_roles;

/// Content-derived transaction id: a pure function of the row's parsed
/// fields plus the synthesized created_at, so re-importing an identical
/// file produces identical ids.
pub fn transaction_id(
    date: &NaiveDate,
    description_or_category: &str,
    amount: &Decimal,
    r#type: TransactionType,
    currency: &str,
    created_at: i64,
) -> String {
    let date_part = date.to_string();
    let amount_part = amount.normalize().to_string();
    let created_part = created_at.to_string();
    let mut hasher = Sha256::new();
    for part in [
        date_part.as_str(),
        description_or_category,
        amount_part.as_str(),
        r#type.as_str(),
        currency,
        created_part.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Imports a parsed file into the ledger given a column mapping and an
/// entity mapping.
///
/// Row-level failures (bad date, type, or amount) skip the row and record
/// an error string; only the column-mapping precondition aborts the import
/// up front, and only persistence failures surface as `Err`. On completion
/// the settlement sequence runs in fixed order: persist links, sync
/// directory state, exit batch mode, synchronous save, rebuild indexes,
/// precompute conversions, recompute balances, re-register accounts,
/// rebuild the aggregate cache, notify observers.
pub fn import_transactions(
    file: &ParsedFile,
    columns: &ColumnMapping,
    entities: &EntityMapping,
    ledger: &mut TransactionLedger,
    accounts: &AccountDirectory,
    categories: &CategoryDirectory,
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    let total = file.rows.len();

    let cols = FieldColumns::resolve(&file.headers, columns);
    let missing = cols.missing_required();
    if !missing.is_empty() {
        result.skipped = total;
        result.errors.push(format!(
            "Column mapping does not resolve required columns: {}",
            missing.join(", ")
        ));
        return Ok(result);
    }

    let base_currency = ledger.base_currency()?;
    // Snapshot of pre-existing data only; rows from this same file are
    // never tested against each other.
    let index = FingerprintIndex::build(ledger)?;

    ledger.begin_batch()?;
    let mut ctx = ResolutionContext::default();
    if let Err(err) = stream_and_settle(
        file,
        columns,
        entities,
        ledger,
        accounts,
        categories,
        &mut progress,
        &cols,
        &base_currency,
        &index,
        &mut ctx,
        &mut result,
    ) {
        // The caller's recovery path is re-invoking with the same file, so
        // the half-written batch must not survive on the connection.
        let _ = ledger.rollback_batch();
        return Err(err);
    }

    result.created_accounts = ctx.created_accounts;
    result.created_categories = ctx.created_categories;
    result.created_subcategories = ctx.created_subcategories;
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn stream_and_settle(
    file: &ParsedFile,
    columns: &ColumnMapping,
    entities: &EntityMapping,
    ledger: &mut TransactionLedger,
    accounts: &AccountDirectory,
    categories: &CategoryDirectory,
    progress: &mut Option<&mut dyn FnMut(f64)>,
    cols: &FieldColumns,
    base_currency: &str,
    index: &FingerprintIndex,
    ctx: &mut ResolutionContext,
    result: &mut ImportResult,
) -> Result<()> {
    let total = file.rows.len();
    let mut accumulator = BatchAccumulator::default();
    let mut all_links: Vec<(String, i64)> = Vec::new();

    for (row_index, row) in file.rows.iter().enumerate() {
        // 1-based plus one for the header line, so errors point at the
        // row the user sees in the source file.
        let row_no = row_index + 2;

        let date_raw = FieldColumns::cell(row, cols.date);
        let type_raw = FieldColumns::cell(row, cols.r#type);
        let amount_raw = FieldColumns::cell(row, cols.amount);
        let currency_raw = FieldColumns::cell(row, cols.currency);
        let account_raw = FieldColumns::cell(row, cols.account);
        let target_account_raw = FieldColumns::cell(row, cols.target_account);
        let target_currency_raw = FieldColumns::cell(row, cols.target_currency);
        let target_amount_raw = FieldColumns::cell(row, cols.target_amount);
        let category_raw = FieldColumns::cell(row, cols.category);
        let subcategories_raw = FieldColumns::cell(row, cols.subcategories);
        let note_raw = FieldColumns::cell(row, cols.note);

        macro_rules! row_try {
            ($parsed:expr) => {
                match $parsed {
                    Ok(v) => v,
                    Err(e) => {
                        result.skipped += 1;
                        result.errors.push(format!("Row {}: {}", row_no, e));
                        report(progress, row_index + 1, total);
                        continue;
                    }
                }
            };
        }

        let date = row_try!(parse_row_date(&date_raw, columns.date_format));
        let r#type = row_try!(parse_row_type(&type_raw, &columns.type_aliases));
        // Amounts are stored positive; the type carries the direction.
        let amount = row_try!(parse_row_amount(&amount_raw)).abs();

        let currency = if currency_raw.is_empty() {
            base_currency.to_string()
        } else {
            currency_raw.to_uppercase()
        };

        let effective = resolve_roles(r#type, &account_raw, &category_raw, &target_account_raw);
        let account = ctx.resolve_account(accounts, entities, &effective.account, &currency)?;

        let target_currency = if target_currency_raw.is_empty() {
            None
        } else {
            Some(target_currency_raw.to_uppercase())
        };
        let target_amount = parse_optional_amount(&target_amount_raw).map(|d| d.abs());
        let target_account = if r#type == TransactionType::InternalTransfer {
            let ccy = target_currency.as_deref().unwrap_or(currency.as_str());
            ctx.resolve_account(accounts, entities, &target_account_raw, ccy)?
        } else {
            None
        };

        let (category_id, category_name) =
            ctx.resolve_category(categories, entities, &effective.category, r#type)?;
        let subcategories = ctx.resolve_subcategories(
            categories,
            &subcategories_raw,
            &columns.subcategory_separator,
            category_id,
        )?;

        // Midnight of the calendar date plus one millisecond per source
        // row preserves intra-day file order under created_at sorts.
        let created_at =
            date.and_time(NaiveTime::MIN).and_utc().timestamp_millis() + row_index as i64;
        let id_seed = if note_raw.is_empty() {
            category_name.as_str()
        } else {
            note_raw.as_str()
        };
        let id = transaction_id(&date, id_seed, &amount, r#type, &currency, created_at);

        let transaction = Transaction {
            id,
            date,
            description: note_raw,
            amount,
            currency,
            converted_amount: None,
            r#type,
            category: category_name,
            subcategory: subcategories.first().map(|(_, name)| name.clone()),
            account_id: account.as_ref().map(|(id, _)| *id),
            account_name: account.map(|(_, name)| name),
            target_account_id: target_account.as_ref().map(|(id, _)| *id),
            target_account_name: target_account.map(|(_, name)| name),
            target_currency,
            target_amount,
            recurring_series_id: None,
            created_at,
        };

        if index.contains(&Fingerprint::of_transaction(&transaction)) {
            result.skipped += 1;
            result.duplicates_skipped += 1;
            report(progress, row_index + 1, total);
            continue;
        }

        let subcategory_ids: Vec<i64> = subcategories.iter().map(|(id, _)| *id).collect();
        accumulator.push(transaction, &subcategory_ids);
        result.imported += 1;
        if accumulator.is_full() {
            accumulator.flush(ledger, &mut all_links)?;
        }
        report(progress, row_index + 1, total);
    }
    accumulator.flush(ledger, &mut all_links)?;

    // Settlement. The order is load-bearing: balances fold over persisted
    // transactions, and observers read the rebuilt aggregate cache.
    categories.link_subcategories_to_transactions(&all_links)?;
    let mut category_links: Vec<(i64, i64)> = ctx.pending_category_links.iter().copied().collect();
    category_links.sort_unstable();
    categories.link_subcategories_to_categories(&category_links)?;
    ledger.end_batch_without_save();
    ledger.save_synchronously()?;
    ledger.rebuild_indexes()?;
    ledger.precompute_conversions()?;
    ledger.recompute_balances()?;
    ledger.register_recomputed_accounts()?;
    ledger.rebuild_category_totals()?;
    ledger.notify_observers()?;

    Ok(())
}

fn report(progress: &mut Option<&mut dyn FnMut(f64)>, done: usize, total: usize) {
    if let Some(cb) = progress.as_mut() {
        if total > 0 {
            (*cb)(done as f64 / total as f64);
        }
    }
}
