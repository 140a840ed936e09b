// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("dev.kopilka", "Kopilka", "kopilka"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("kopilka.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        currency TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        balance_mode TEXT NOT NULL DEFAULT 'tracked',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        icon TEXT NOT NULL DEFAULT '',
        color TEXT NOT NULL DEFAULT '',
        UNIQUE(name, type)
    );

    CREATE TABLE IF NOT EXISTS subcategories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS subcategory_categories(
        subcategory_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        UNIQUE(subcategory_id, category_id),
        FOREIGN KEY(subcategory_id) REFERENCES subcategories(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
    );

    -- Transaction ids are content-derived TEXT keys (see import engine).
    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        converted_amount TEXT,
        type TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        subcategory TEXT,
        account_id INTEGER,
        account_name TEXT,
        target_account_id INTEGER,
        target_account_name TEXT,
        target_currency TEXT,
        target_amount TEXT,
        recurring_series_id INTEGER,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at);
    CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category, type);

    CREATE TABLE IF NOT EXISTS transaction_subcategories(
        transaction_id TEXT NOT NULL,
        subcategory_id INTEGER NOT NULL,
        UNIQUE(transaction_id, subcategory_id),
        FOREIGN KEY(subcategory_id) REFERENCES subcategories(id) ON DELETE CASCADE
    );

    -- FX rates: store base->quote rate (1 base = rate quote) per day
    CREATE TABLE IF NOT EXISTS fx_rates(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        base TEXT NOT NULL,
        quote TEXT NOT NULL,
        rate TEXT NOT NULL,
        UNIQUE(date, base, quote)
    );

    -- Latest per-currency rate toward the base currency, rebuilt after
    -- each import so summary views never convert on the fly.
    CREATE TABLE IF NOT EXISTS fx_cache(
        currency TEXT PRIMARY KEY,
        base TEXT NOT NULL,
        rate TEXT NOT NULL
    );

    -- Aggregate cache consumed by summary views; rebuilt at settlement.
    CREATE TABLE IF NOT EXISTS category_totals(
        category TEXT NOT NULL,
        type TEXT NOT NULL,
        currency TEXT NOT NULL,
        total TEXT NOT NULL,
        tx_count INTEGER NOT NULL,
        UNIQUE(category, type, currency)
    );
    "#,
    )?;
    Ok(())
}
