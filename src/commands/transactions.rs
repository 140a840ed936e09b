// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::utils::{maybe_print_json, pretty_table};

#[derive(Serialize)]
struct TxRow {
    date: String,
    r#type: String,
    amount: String,
    currency: String,
    category: String,
    account: Option<String>,
    description: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub),
        _ => Ok(()),
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50);
    let json = sub.get_flag("json");

    let mut stmt = conn.prepare(
        "SELECT date, type, amount, currency, category, account_name, description \
         FROM transactions ORDER BY created_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok(TxRow {
            date: r.get(0)?,
            r#type: r.get(1)?,
            amount: r.get(2)?,
            currency: r.get(3)?,
            category: r.get(4)?,
            account: r.get(5)?,
            description: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }

    if maybe_print_json(json, &out)? {
        return Ok(());
    }
    let data = out
        .into_iter()
        .map(|t| {
            vec![
                t.date,
                t.r#type,
                t.amount,
                t.currency,
                t.category,
                t.account.unwrap_or_default(),
                t.description,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Date", "Type", "Amount", "Ccy", "Category", "Account", "Note"],
            data
        )
    );
    Ok(())
}
