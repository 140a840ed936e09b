// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, trim, collapse internal whitespace runs to one space.
/// Shared by the fingerprint and any fuzzy name comparison.
pub fn normalize_text(s: &str) -> String {
    WHITESPACE_RUNS
        .replace_all(s.trim(), " ")
        .to_lowercase()
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

// Base currency settings
pub fn get_base_currency(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='base_currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| "USD".to_string()))
}

pub fn set_base_currency(conn: &Connection, ccy: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('base_currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

/// Convert an amount from 'from_ccy' to 'to_ccy' using the closest on-or-before
/// stored rate. Rates are stored base->quote; pairs not found directly go via
/// the base currency hub. Missing rates leave the amount unconverted.
pub fn fx_convert(
    conn: &Connection,
    date: NaiveDate,
    amount: Decimal,
    from_ccy: &str,
    to_ccy: &str,
) -> Result<Decimal> {
    if from_ccy == to_ccy {
        return Ok(amount);
    }
    let hub = get_base_currency(conn)?;

    fn find_rate(
        conn: &Connection,
        date: NaiveDate,
        base: &str,
        quote: &str,
    ) -> Result<Option<Decimal>> {
        let mut stmt = conn.prepare(
            "SELECT rate FROM fx_rates WHERE base=?1 AND quote=?2 AND date<=?3 ORDER BY date DESC LIMIT 1"
        )?;
        let r: Option<String> = stmt
            .query_row(params![base, quote, date.to_string()], |r| r.get(0))
            .optional()?;
        if let Some(s) = r {
            let d = s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid rate '{}' for {}/{}", s, base, quote))?;
            Ok(Some(d))
        } else {
            Ok(None)
        }
    }

    if to_ccy == hub {
        if let Some(r) = find_rate(conn, date, &hub, from_ccy)? {
            if r.is_zero() {
                return Ok(amount);
            }
            return Ok(amount / r);
        }
    } else if from_ccy == hub {
        if let Some(r) = find_rate(conn, date, &hub, to_ccy)? {
            return Ok(amount * r);
        }
    } else {
        let base_amt = fx_convert(conn, date, amount, from_ccy, &hub)?;
        return fx_convert(conn, date, base_amt, &hub, to_ccy);
    }

    // Try reciprocal last
    if let Some(r) = find_rate(conn, date, to_ccy, from_ccy)? {
        if r.is_zero() {
            return Ok(amount);
        }
        return Ok(amount / r);
    }

    Ok(amount)
}

pub fn maybe_print_json<T: serde::Serialize>(json_flag: bool, v: &T) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    Ok(false)
}
