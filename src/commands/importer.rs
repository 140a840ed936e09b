// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use std::fs;

use crate::directory::{AccountDirectory, CategoryDirectory};
use crate::import;
use crate::ledger::TransactionLedger;
use crate::models::{ColumnMapping, EntityMapping, ParsedFile};
use crate::utils::maybe_print_json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn read_parsed_file(path: &str) -> Result<ParsedFile> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Read CSV headers from {}", path))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let rec = record?;
        rows.push(rec.iter().map(|c| c.to_string()).collect());
    }
    Ok(ParsedFile { headers, rows })
}

fn import_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let file = read_parsed_file(path)?;

    let columns: ColumnMapping = match sub.get_one::<String>("mapping") {
        Some(p) => {
            let raw = fs::read_to_string(p).with_context(|| format!("Read mapping {}", p))?;
            serde_json::from_str(&raw).with_context(|| format!("Parse mapping {}", p))?
        }
        None => ColumnMapping::standard(),
    };
    let entities: EntityMapping = match sub.get_one::<String>("entities") {
        Some(p) => {
            let raw = fs::read_to_string(p).with_context(|| format!("Read entity mapping {}", p))?;
            serde_json::from_str(&raw).with_context(|| format!("Parse entity mapping {}", p))?
        }
        None => EntityMapping::default(),
    };

    let accounts = AccountDirectory::new(conn);
    let categories = CategoryDirectory::new(conn);
    let mut ledger = TransactionLedger::new(conn);

    let mut last_pct = 0u32;
    let mut progress = |fraction: f64| {
        let pct = (fraction * 100.0) as u32;
        if pct >= last_pct + 10 {
            last_pct = pct - pct % 10;
            eprintln!("... {}%", last_pct);
        }
    };
    let result = import::import_transactions(
        &file,
        &columns,
        &entities,
        &mut ledger,
        &accounts,
        &categories,
        Some(&mut progress),
    )?;

    if maybe_print_json(sub.get_flag("json"), &result)? {
        return Ok(());
    }
    println!(
        "Imported {} of {} rows from {} ({} skipped: {} duplicates, {} invalid)",
        result.imported,
        file.rows.len(),
        path,
        result.skipped,
        result.duplicates_skipped,
        result.skipped - result.duplicates_skipped,
    );
    if result.created_accounts + result.created_categories + result.created_subcategories > 0 {
        println!(
            "Created {} accounts, {} categories, {} subcategories",
            result.created_accounts, result.created_categories, result.created_subcategories
        );
    }
    for err in &result.errors {
        eprintln!("  {}", err);
    }
    Ok(())
}
